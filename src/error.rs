use std::time::Duration;

use thiserror::Error;

use crate::core::task::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Circular dependency detected in task graph: {}", join_ids(.tasks))]
    CircularDependency { tasks: Vec<TaskId> },

    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("Task {task} requires unknown task {prerequisite}")]
    UnknownPrerequisite { task: TaskId, prerequisite: TaskId },

    #[error("No worker found for task type: {0}")]
    UnknownTaskType(String),

    #[error("Task {task_id} timed out after {limit:?} (elapsed {elapsed:?})")]
    Timeout {
        task_id: TaskId,
        limit: Duration,
        elapsed: Duration,
    },

    #[error("{0}")]
    Worker(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl Error {
    /// Build a worker error from any displayable failure.
    pub fn worker(msg: impl std::fmt::Display) -> Self {
        Self::Worker(msg.to_string())
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
