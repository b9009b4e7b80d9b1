//! Aggregated outcomes returned by the orchestrator.

use crate::core::plan::PlanId;
use crate::core::task::{TaskId, TaskResult};
use crate::orchestration::events::RunId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one phase of a plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub index: usize,
    pub task_count: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub duration_ms: u64,
}

/// Counters for a whole plan run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    /// Tasks in phases that never started because of a critical failure.
    pub skipped_tasks: usize,
    pub total_duration_ms: u64,
    /// Index of the phase whose critical failure stopped the run.
    pub aborted_at_phase: Option<usize>,
    pub phases: Vec<PhaseReport>,
}

impl PlanSummary {
    pub fn is_aborted(&self) -> bool {
        self.aborted_at_phase.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub run_id: RunId,
    pub plan_id: PlanId,
    /// Results of every task that ran, in phase then submission order.
    pub results: Vec<TaskResult>,
    pub summary: PlanSummary,
}

impl PlanReport {
    pub fn result(&self, id: &TaskId) -> Option<&TaskResult> {
        self.results.iter().find(|r| &r.task_id == id)
    }
}

/// Counters for one parallel batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub cached_tasks: usize,
    /// Mean over every result in the batch, cache hits included.
    pub average_execution_time_ms: f64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One result per input task, in input order.
    pub results: Vec<TaskResult>,
    pub summary: BatchSummary,
}

impl BatchSummary {
    pub(crate) fn from_results(results: &[TaskResult], cached: usize, duration_ms: u64) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        let average = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.execution_time_ms as f64).sum::<f64>() / results.len() as f64
        };

        Self {
            total_tasks: results.len(),
            successful_tasks: successful,
            failed_tasks: results.len() - successful,
            cached_tasks: cached,
            average_execution_time_ms: average,
            total_duration_ms: duration_ms,
        }
    }
}

/// A stored result together with the stored results of its prerequisites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResultWithDependencies {
    pub result: Option<TaskResult>,
    pub dependencies: BTreeMap<TaskId, TaskResult>,
}
