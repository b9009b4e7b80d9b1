//! Task type to worker routing.
//!
//! The router is a plain lookup table from a task's `type` string to a
//! [`WorkerKind`]. It never infers a worker from the payload.

use crate::config::Config;
use crate::core::task::Task;
use crate::error::{Error, Result};
use crate::orchestration::pool::WorkerPool;
use crate::orchestration::worker::{WorkerHandle, WorkerKind};
use std::collections::HashMap;

/// Built-in routes for the standard workers.
fn default_routes() -> [(&'static str, WorkerKind); 11] {
    [
        ("visual-analysis", WorkerKind::VisualIntelligence),
        ("data-validation", WorkerKind::DataAccuracy),
        ("api-fetch", WorkerKind::ApiIntegration),
        ("market-analysis", WorkerKind::MarketAnalysis),
        ("document-process", WorkerKind::DocumentProcessing),
        ("price-trend", WorkerKind::MarketAnalysis),
        ("neighborhood-ranking", WorkerKind::MarketAnalysis),
        ("construction-correlation", WorkerKind::MarketAnalysis),
        ("market-heatmap", WorkerKind::MarketAnalysis),
        ("roi-calculation", WorkerKind::MarketAnalysis),
        ("emerging-neighborhoods", WorkerKind::MarketAnalysis),
    ]
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: HashMap<String, WorkerKind>,
}

impl Router {
    /// The built-in routes plus any `[routes]` from the config file.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::default();
        for (task_type, kind) in &config.routes {
            router.add_route(task_type, kind.clone());
        }
        router
    }

    /// Add or replace the route for `task_type`.
    pub fn add_route(&mut self, task_type: &str, kind: WorkerKind) -> Option<WorkerKind> {
        self.routes.insert(task_type.to_string(), kind)
    }

    /// The worker kind registered for `task_type`, if any.
    pub fn resolve(&self, task_type: &str) -> Option<&WorkerKind> {
        self.routes.get(task_type)
    }

    /// Find the registered worker that handles `task`.
    ///
    /// # Errors
    /// Returns `UnknownTaskType` if the type has no route or the routed
    /// worker has not been registered.
    pub fn route<'p>(&self, task: &Task, pool: &'p WorkerPool) -> Result<&'p WorkerHandle> {
        self.resolve(&task.task_type)
            .and_then(|kind| pool.get(kind))
            .ok_or_else(|| Error::UnknownTaskType(task.task_type.clone()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self {
            routes: default_routes()
                .into_iter()
                .map(|(task_type, kind)| (task_type.to_string(), kind))
                .collect(),
        }
    }
}
