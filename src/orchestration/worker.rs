//! Worker capability trait and the execution wrapper shared by all workers.
//!
//! A [`Worker`] only knows how to execute a single task. [`WorkerHandle`]
//! layers the common policies on top of that: a per-task timeout, turning
//! errors into failed [`TaskResult`]s, and chunked bulk execution bounded
//! by the worker's `max_concurrent` setting.

use crate::core::task::{Task, TaskResult};
use crate::error::{Error, Result};
use crate::util::{retry, spawn_with_timeout};
use crate::{tflog_debug, tflog_trace, tflog_warn};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of tasks a worker runs at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default per-task timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries for [`WorkerConfig::retry`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between retries.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Identifier of a worker capability.
///
/// Serialized as a kebab-case string; any name that is not one of the
/// built-in capabilities becomes [`WorkerKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkerKind {
    /// Property photo and imagery analysis.
    VisualIntelligence,
    /// Cross-checking records for accuracy.
    DataAccuracy,
    /// Fetching data from external APIs.
    ApiIntegration,
    /// Market trends, rankings and ROI calculations.
    MarketAnalysis,
    /// Document text extraction and analysis.
    DocumentProcessing,
    /// Caller-defined capability.
    Custom(String),
}

impl WorkerKind {
    pub fn as_str(&self) -> &str {
        match self {
            WorkerKind::VisualIntelligence => "visual-intelligence",
            WorkerKind::DataAccuracy => "data-accuracy",
            WorkerKind::ApiIntegration => "api-integration",
            WorkerKind::MarketAnalysis => "market-analysis",
            WorkerKind::DocumentProcessing => "document-processing",
            WorkerKind::Custom(name) => name,
        }
    }
}

impl From<&str> for WorkerKind {
    fn from(s: &str) -> Self {
        match s {
            "visual-intelligence" => WorkerKind::VisualIntelligence,
            "data-accuracy" => WorkerKind::DataAccuracy,
            "api-integration" => WorkerKind::ApiIntegration,
            "market-analysis" => WorkerKind::MarketAnalysis,
            "document-processing" => WorkerKind::DocumentProcessing,
            other => WorkerKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for WorkerKind {
    fn from(s: String) -> Self {
        WorkerKind::from(s.as_str())
    }
}

impl From<WorkerKind> for String {
    fn from(kind: WorkerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution limits for a worker, supplied at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Size of each chunk in bulk execution.
    pub max_concurrent: usize,
    /// Timeout used when a task does not carry its own.
    pub timeout: Duration,
    /// Retries performed by [`WorkerConfig::retry`].
    pub retry_attempts: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl WorkerConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Retry `op` with this configuration's attempts and delay.
    ///
    /// For use inside [`Worker::execute`] around calls that may fail
    /// transiently; the orchestrator itself never retries.
    pub async fn retry<F, Fut, T>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry(self.retry_attempts, self.retry_delay, label, op).await
    }
}

/// A capability unit that executes tasks of one or more types.
///
/// Implementations must not touch orchestrator state; they may have their
/// own external side effects.
#[async_trait]
pub trait Worker: Send + Sync {
    /// The capability this worker is registered under.
    fn kind(&self) -> WorkerKind;

    /// Execution limits applied by [`WorkerHandle`].
    fn config(&self) -> &WorkerConfig;

    /// Execute one task and return its output.
    async fn execute(&self, task: &Task) -> Result<Value>;
}

/// Shared, clonable handle to a registered worker.
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<dyn Worker>,
    kind: WorkerKind,
}

impl WorkerHandle {
    pub fn new(worker: Arc<dyn Worker>) -> Self {
        let kind = worker.kind();
        Self {
            inner: worker,
            kind,
        }
    }

    pub fn kind(&self) -> &WorkerKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.as_str()
    }

    pub fn config(&self) -> &WorkerConfig {
        self.inner.config()
    }

    /// The timeout that applies to `task`.
    pub fn timeout_for(&self, task: &Task) -> Duration {
        task.timeout.unwrap_or(self.config().timeout)
    }

    /// Execute `task` racing against its timeout.
    ///
    /// On timeout the execution is left running in the background and its
    /// output is discarded.
    ///
    /// # Errors
    /// Returns `Timeout` when the limit passes first, `TaskJoin` if the
    /// execution panicked, or the worker's own error.
    pub async fn execute_bounded(&self, task: &Task) -> Result<Value> {
        let limit = self.timeout_for(task);
        let start = Instant::now();
        let worker = Arc::clone(&self.inner);
        let owned = task.clone();

        match spawn_with_timeout(limit, async move { worker.execute(&owned).await }).await {
            Some(result) => result,
            None => Err(Error::Timeout {
                task_id: task.id.clone(),
                limit,
                elapsed: start.elapsed(),
            }),
        }
    }

    /// Execute `task` and capture the outcome as a result.
    ///
    /// Never fails: errors and timeouts become failed results.
    pub async fn process_task(&self, task: &Task) -> TaskResult {
        let start = Instant::now();
        tflog_debug!("[{}] Processing task: {}", self.name(), task.id);

        match self.execute_bounded(task).await {
            Ok(data) => TaskResult::success(task.id.clone(), self.name(), data, elapsed_ms(start)),
            Err(e) => {
                tflog_warn!("[{}] Error processing task {}: {}", self.name(), task.id, e);
                TaskResult::failure(task.id.clone(), self.name(), &e.to_string(), elapsed_ms(start))
            }
        }
    }

    /// Execute `tasks` in consecutive chunks of `max_concurrent`.
    ///
    /// Every task in a chunk has resolved before the next chunk starts.
    /// Results are returned in input order.
    pub async fn process_batch(&self, tasks: &[Task]) -> Vec<TaskResult> {
        let chunk_size = self.config().max_concurrent.max(1);
        let mut results = Vec::with_capacity(tasks.len());

        for (index, chunk) in tasks.chunks(chunk_size).enumerate() {
            tflog_trace!(
                "[{}] Running chunk {} with {} tasks",
                self.name(),
                index,
                chunk.len()
            );
            let chunk_results = join_all(chunk.iter().map(|task| self.process_task(task))).await;
            results.extend(chunk_results);
        }

        results
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("kind", &self.kind)
            .field("config", self.config())
            .finish()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
