//! Orchestration layer: workers, routing, plan execution and result caching.
//!
//! Workers implement [`Worker`] and are registered with an [`Orchestrator`],
//! which routes tasks to them by type, runs plans phase by phase and keeps
//! results, metrics and a short-lived result cache.

mod cache;
mod events;
mod metrics;
mod orchestrator;
mod pool;
mod report;
mod router;
mod worker;

pub use cache::{CacheEntry, ResultCache};
pub use events::{OrchestratorEvent, RunId};
pub use metrics::WorkerMetrics;
pub use orchestrator::{Orchestrator, CACHE_WORKER};
pub use pool::{WorkerPool, WorkerStatus};
pub use report::{
    BatchReport, BatchSummary, PhaseReport, PlanReport, PlanSummary, TaskResultWithDependencies,
};
pub use router::Router;
pub use worker::{
    Worker, WorkerConfig, WorkerHandle, WorkerKind, DEFAULT_MAX_CONCURRENT, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
