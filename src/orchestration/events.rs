//! Events emitted by the orchestrator while it works.
//!
//! Events are offered on an optional `tokio::sync::mpsc` channel without
//! waiting. When the channel is full or closed the event is dropped, so a
//! slow or absent receiver never affects execution.

use crate::core::plan::PlanId;
use crate::core::task::TaskId;
use crate::orchestration::report::PlanSummary;
use crate::orchestration::worker::WorkerKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one execution of a plan.
///
/// The same plan may be executed many times; each run gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something observable happened inside the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// A worker was added to the pool.
    WorkerRegistered {
        kind: WorkerKind,
        /// Whether an earlier worker of the same kind was replaced.
        replaced: bool,
    },
    /// A plan was built and stored.
    PlanCreated {
        plan_id: PlanId,
        phases: usize,
        total_tasks: usize,
    },
    /// A phase is about to be dispatched.
    PhaseStarted {
        run_id: RunId,
        index: usize,
        tasks: Vec<TaskId>,
    },
    /// Every task of a phase has resolved.
    PhaseCompleted {
        run_id: RunId,
        index: usize,
        duration_ms: u64,
        successful: usize,
        failed: usize,
    },
    /// A priority-1 task failed; remaining phases are skipped.
    CriticalFailure {
        run_id: RunId,
        phase: usize,
        task_ids: Vec<TaskId>,
    },
    /// A plan run finished, whether or not it was aborted.
    PlanCompleted { run_id: RunId, summary: PlanSummary },
    /// Tasks in a parallel batch were answered from the cache.
    CacheHits { count: usize },
    /// The result cache was emptied.
    CacheCleared,
}
