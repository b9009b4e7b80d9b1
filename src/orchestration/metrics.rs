//! Per-worker performance counters.

use crate::core::task::TaskResult;
use serde::{Deserialize, Serialize};

/// Running counters for one worker.
///
/// Counters only grow; they are reset solely by an explicit operator call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub average_execution_time_ms: f64,
    pub last_execution_time_ms: Option<u64>,
    /// `failed_tasks / total_tasks`, 0 before the first task.
    pub error_rate: f64,
}

impl WorkerMetrics {
    /// Fold one result into the counters.
    pub fn record(&mut self, result: &TaskResult) {
        self.total_tasks += 1;
        if result.is_success() {
            self.successful_tasks += 1;
        } else {
            self.failed_tasks += 1;
        }

        let n = self.total_tasks as f64;
        let previous_total = self.average_execution_time_ms * (n - 1.0);
        self.average_execution_time_ms = (previous_total + result.execution_time_ms as f64) / n;
        self.last_execution_time_ms = Some(result.execution_time_ms);
        self.error_rate = self.failed_tasks as f64 / n;
    }
}
