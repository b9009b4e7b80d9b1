//! Core domain models for task orchestration.
//!
//! This module contains the fundamental data structures used throughout
//! the orchestration system: tasks and results, the dependency DAG, and
//! the phased execution plans built from it.

pub mod dag;
pub mod plan;
pub mod task;

pub use dag::TaskDAG;
pub use plan::{ExecutionPlan, Phase, PlanId};
pub use task::{DependencyEdge, Task, TaskId, TaskOutcome, TaskResult, CRITICAL_PRIORITY};
