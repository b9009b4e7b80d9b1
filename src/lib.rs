//! In-process task orchestration.
//!
//! Tasks and their dependency edges are planned into phases of mutually
//! independent work, routed by type to registered workers, and executed
//! with per-task timeouts, chunked concurrency, critical-failure aborts,
//! result caching and per-worker metrics.

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod util;

pub use crate::core::{DependencyEdge, ExecutionPlan, Task, TaskId, TaskResult};
pub use config::{Config, OrchestratorConfig};
pub use error::{Error, Result};
pub use orchestration::{Orchestrator, Worker, WorkerConfig, WorkerKind};
