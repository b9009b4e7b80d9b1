//! Worker pool for multi-worker management.
//!
//! The `WorkerPool` holds one handle per worker kind. Registering a kind
//! that is already present replaces the previous worker.

use crate::orchestration::metrics::WorkerMetrics;
use crate::orchestration::worker::{Worker, WorkerConfig, WorkerHandle, WorkerKind};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of a registered worker for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub kind: WorkerKind,
    pub max_concurrent: usize,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    /// Absent when metrics collection is disabled.
    pub metrics: Option<WorkerMetrics>,
}

impl WorkerStatus {
    pub fn new(kind: WorkerKind, config: &WorkerConfig, metrics: Option<WorkerMetrics>) -> Self {
        Self {
            kind,
            max_concurrent: config.max_concurrent,
            timeout_ms: config.timeout.as_millis() as u64,
            retry_attempts: config.retry_attempts,
            metrics,
        }
    }
}

/// Registry of workers keyed by their capability.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use taskforge::orchestration::WorkerPool;
///
/// let mut pool = WorkerPool::new();
/// pool.register(Arc::new(MarketAnalysisWorker::default()));
/// assert_eq!(pool.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct WorkerPool {
    workers: HashMap<WorkerKind, WorkerHandle>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under its own kind.
    ///
    /// Returns the handle it replaced, if any.
    pub fn register(&mut self, worker: Arc<dyn Worker>) -> Option<WorkerHandle> {
        let handle = WorkerHandle::new(worker);
        self.workers.insert(handle.kind().clone(), handle)
    }

    pub fn get(&self, kind: &WorkerKind) -> Option<&WorkerHandle> {
        self.workers.get(kind)
    }

    pub fn contains(&self, kind: &WorkerKind) -> bool {
        self.workers.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<WorkerKind> {
        let mut kinds: Vec<WorkerKind> = self.workers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.values()
    }
}
