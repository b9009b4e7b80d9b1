//! Task and result data model.
//!
//! Tasks are immutable descriptors submitted by callers. Results are
//! produced once per task execution returned to the caller and carry
//! either the worker's output or an error description, never both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Priority value that marks a task as critical.
///
/// A failed critical task aborts the remaining phases of a plan.
pub const CRITICAL_PRIORITY: u32 = 1;

/// Caller-supplied identifier of a task.
///
/// Ids must be unique within a single plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within a plan.
    pub id: TaskId,
    /// Capability tag used to route the task to a worker.
    #[serde(rename = "type")]
    pub task_type: String,
    /// Priority; `1` marks the task as critical.
    #[serde(default)]
    pub priority: u32,
    /// Opaque input for the worker.
    #[serde(default)]
    pub payload: Value,
    /// Overrides the worker's default timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Task {
    /// Create a task with no payload, priority 0 and the worker's timeout.
    pub fn new(id: impl Into<TaskId>, task_type: &str) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.to_string(),
            priority: 0,
            payload: Value::Null,
            timeout: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check if a failure of this task aborts the rest of its plan.
    pub fn is_critical(&self) -> bool {
        self.priority == CRITICAL_PRIORITY
    }
}

/// Declares that `task_id` may not run before every id in `required_task_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub task_id: TaskId,
    pub required_task_ids: BTreeSet<TaskId>,
}

impl DependencyEdge {
    pub fn new<I, T>(task_id: impl Into<TaskId>, required: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        Self {
            task_id: task_id.into(),
            required_task_ids: required.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TaskOutcome {
    Success { data: Value },
    Failure { error: String },
}

/// Result of executing a task, as returned to the caller and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    /// Name of the worker that produced the result, `"cache"` for cache hits.
    pub worker: String,
    pub outcome: TaskOutcome,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(task_id: TaskId, worker: &str, data: Value, execution_time_ms: u64) -> Self {
        Self {
            task_id,
            worker: worker.to_string(),
            outcome: TaskOutcome::Success { data },
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(task_id: TaskId, worker: &str, error: &str, execution_time_ms: u64) -> Self {
        Self {
            task_id,
            worker: worker.to_string(),
            outcome: TaskOutcome::Failure {
                error: error.to_string(),
            },
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success { .. })
    }

    /// The worker output, present only on success.
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            TaskOutcome::Success { data } => Some(data),
            TaskOutcome::Failure { .. } => None,
        }
    }

    /// The error description, present only on failure.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { error } => Some(error),
        }
    }
}
