//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A configurable mock worker that records calls and peak concurrency
//! - Orchestrators pre-loaded with mock workers
//! - Predefined task constructors for the standard task types

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use taskforge::config::OrchestratorConfig;
use taskforge::core::task::{Task, TaskId};
use taskforge::orchestration::{Orchestrator, Worker, WorkerConfig, WorkerKind};
use taskforge::Error;

/// A worker that sleeps, then echoes the payload.
///
/// A payload with `"fail": true` makes the task fail and `"delay_ms": n`
/// overrides the worker's sleep for that task.
pub struct MockWorker {
    kind: WorkerKind,
    config: WorkerConfig,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    finished: Mutex<Vec<(TaskId, Instant)>>,
}

impl MockWorker {
    pub fn new(kind: WorkerKind) -> Self {
        Self {
            kind,
            config: WorkerConfig::default(),
            delay: Duration::from_millis(1),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of times `execute` was entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous executions observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Completion instant of `id`, if it completed.
    pub fn finished_at(&self, id: &str) -> Option<Instant> {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .find(|(task_id, _)| task_id.as_str() == id)
            .map(|(_, at)| *at)
    }
}

#[async_trait]
impl Worker for MockWorker {
    fn kind(&self) -> WorkerKind {
        self.kind.clone()
    }

    fn config(&self) -> &WorkerConfig {
        &self.config
    }

    async fn execute(&self, task: &Task) -> taskforge::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = task.payload["delay_ms"]
            .as_u64()
            .map(Duration::from_millis)
            .unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished
            .lock()
            .unwrap()
            .push((task.id.clone(), Instant::now()));

        if task.payload["fail"] == json!(true) {
            return Err(Error::worker(format!("{} could not process {}", self.kind, task.id)));
        }
        Ok(json!({ "worker": self.kind.as_str(), "input": task.payload }))
    }
}

/// An orchestrator with default config and the given workers registered.
pub fn orchestrator_with(workers: &[Arc<MockWorker>]) -> Orchestrator {
    orchestrator_with_config(OrchestratorConfig::default(), workers)
}

pub fn orchestrator_with_config(
    config: OrchestratorConfig,
    workers: &[Arc<MockWorker>],
) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(config);
    for worker in workers {
        orchestrator.register_worker(worker.clone());
    }
    orchestrator
}

/// An `api-fetch` task (routed to the API integration worker).
pub fn fetch(id: &str) -> Task {
    Task::new(id, "api-fetch").with_payload(json!({ "source": id }))
}

/// A `data-validation` task (routed to the data accuracy worker).
pub fn validate(id: &str) -> Task {
    Task::new(id, "data-validation").with_payload(json!({ "record": id }))
}

/// A `price-trend` task (routed to the market analysis worker).
pub fn price_trend(id: &str, zip: &str) -> Task {
    Task::new(id, "price-trend").with_payload(json!({ "zip": zip }))
}

/// Mark `task` as failing when executed by a mock worker.
pub fn failing(task: Task) -> Task {
    let mut payload = task.payload.clone();
    payload["fail"] = json!(true);
    task.with_payload(payload)
}

/// Make `task` sleep for `ms` when executed by a mock worker.
pub fn slow(task: Task, ms: u64) -> Task {
    let mut payload = task.payload.clone();
    payload["delay_ms"] = json!(ms);
    task.with_payload(payload)
}
