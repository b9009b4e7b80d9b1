//! Plan execution, parallel batches, result caching and metrics.
//!
//! The `Orchestrator` owns every registered worker and all run state. It is
//! driven through `&mut self`: worker executions run concurrently inside a
//! phase, and the orchestrator's own tables are only touched once the phase
//! has fully joined.
//!
//! # Example
//!
//! ```ignore
//! use taskforge::orchestration::Orchestrator;
//! use taskforge::config::OrchestratorConfig;
//!
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
//! orchestrator.register_worker(Arc::new(MarketAnalysisWorker::default()));
//!
//! let report = orchestrator.submit(tasks, &edges).await?;
//! println!("{} of {} succeeded", report.summary.successful_tasks, report.summary.total_tasks);
//! ```

use crate::config::{Config, OrchestratorConfig};
use crate::core::plan::{ExecutionPlan, PlanId};
use crate::core::task::{DependencyEdge, Task, TaskId, TaskResult};
use crate::error::{Error, Result};
use crate::orchestration::cache::ResultCache;
use crate::orchestration::events::{OrchestratorEvent, RunId};
use crate::orchestration::metrics::WorkerMetrics;
use crate::orchestration::pool::{WorkerPool, WorkerStatus};
use crate::orchestration::report::{
    BatchReport, BatchSummary, PhaseReport, PlanReport, PlanSummary, TaskResultWithDependencies,
};
use crate::orchestration::router::Router;
use crate::orchestration::worker::{elapsed_ms, Worker, WorkerHandle, WorkerKind};
use crate::{tflog, tflog_debug, tflog_error};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Worker name recorded on results served from the cache.
pub const CACHE_WORKER: &str = "cache";

/// Tasks bound for one worker within a single dispatch.
struct DispatchGroup {
    handle: WorkerHandle,
    /// Position of each task in the dispatched slice.
    indices: Vec<usize>,
    tasks: Vec<Task>,
}

/// Coordinates workers over plans and parallel batches.
pub struct Orchestrator {
    config: OrchestratorConfig,
    router: Router,
    pool: WorkerPool,
    /// Latest result per task id.
    results: HashMap<TaskId, TaskResult>,
    metrics: BTreeMap<WorkerKind, WorkerMetrics>,
    cache: ResultCache,
    plans: HashMap<PlanId, ExecutionPlan>,
    event_tx: Option<mpsc::Sender<OrchestratorEvent>>,
}

impl Orchestrator {
    /// Create an orchestrator with the built-in routes and no workers.
    pub fn new(config: OrchestratorConfig) -> Self {
        let cache = ResultCache::new(config.cache_ttl());
        Self {
            config,
            router: Router::default(),
            pool: WorkerPool::new(),
            results: HashMap::new(),
            metrics: BTreeMap::new(),
            cache,
            plans: HashMap::new(),
            event_tx: None,
        }
    }

    /// Create an orchestrator from a loaded config file.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.orchestrator.clone()).with_router(Router::from_config(config))
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Send [`OrchestratorEvent`]s on `tx`.
    pub fn with_event_sender(mut self, tx: mpsc::Sender<OrchestratorEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Offer `event` to the event channel without waiting.
    ///
    /// Events are dropped when the channel is full or closed.
    fn emit(&self, event: OrchestratorEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        if let Err(TrySendError::Full(event)) = tx.try_send(event) {
            tflog_debug!("Event channel full, dropping event: {:?}", event);
        }
    }

    // Workers

    /// Register `worker` under its kind, replacing any earlier worker of the
    /// same kind. Existing metrics for the kind are kept.
    pub fn register_worker(&mut self, worker: Arc<dyn Worker>) {
        let kind = worker.kind();
        let replaced = self.pool.register(worker).is_some();
        self.metrics.entry(kind.clone()).or_default();

        if replaced {
            tflog!("Replaced worker: {}", kind);
        } else {
            tflog!("Registered worker: {}", kind);
        }
        self.emit(OrchestratorEvent::WorkerRegistered { kind, replaced });
    }

    /// Registered worker kinds, sorted.
    pub fn registered_workers(&self) -> Vec<WorkerKind> {
        self.pool.kinds()
    }

    /// Configuration and metrics snapshot of every registered worker.
    pub fn worker_statuses(&self) -> Vec<WorkerStatus> {
        let mut handles: Vec<&WorkerHandle> = self.pool.handles().collect();
        handles.sort_by(|a, b| a.kind().cmp(b.kind()));

        handles
            .into_iter()
            .map(|handle| {
                let metrics = if self.config.enable_metrics {
                    self.metrics.get(handle.kind()).cloned()
                } else {
                    None
                };
                WorkerStatus::new(handle.kind().clone(), handle.config(), metrics)
            })
            .collect()
    }

    // Planning

    /// Build a plan for `tasks` and store it by id.
    ///
    /// # Errors
    /// Returns `DuplicateTask`, `UnknownPrerequisite` or `CircularDependency`
    /// when the tasks cannot be planned.
    pub fn create_plan(
        &mut self,
        tasks: Vec<Task>,
        edges: &[DependencyEdge],
    ) -> Result<ExecutionPlan> {
        let routed = Duration::from_millis(self.config.estimate_routed_ms);
        let unrouted = Duration::from_millis(self.config.estimate_unrouted_ms);
        let router = &self.router;
        let pool = &self.pool;

        let plan = ExecutionPlan::build(tasks, edges, |task| {
            if router.route(task, pool).is_ok() {
                routed
            } else {
                unrouted
            }
        })?;

        tflog!(
            "Created plan {} with {} phases for {} tasks (estimated {:?})",
            plan.id,
            plan.phase_count(),
            plan.total_tasks,
            plan.estimated_duration
        );
        self.plans.insert(plan.id.clone(), plan.clone());
        self.emit(OrchestratorEvent::PlanCreated {
            plan_id: plan.id.clone(),
            phases: plan.phase_count(),
            total_tasks: plan.total_tasks,
        });

        Ok(plan)
    }

    pub fn get_plan(&self, id: &PlanId) -> Option<&ExecutionPlan> {
        self.plans.get(id)
    }

    // Execution

    /// Plan and execute `tasks` in one call.
    ///
    /// # Errors
    /// Returns planning errors from [`Orchestrator::create_plan`] and routing
    /// errors from [`Orchestrator::execute_plan`].
    pub async fn submit(&mut self, tasks: Vec<Task>, edges: &[DependencyEdge]) -> Result<PlanReport> {
        let plan = self.create_plan(tasks, edges)?;
        self.execute_plan(&plan).await
    }

    /// Execute `plan` phase by phase.
    ///
    /// Every task is routed before anything runs. Within a phase each
    /// worker's tasks run as one chunked batch and all workers run at once;
    /// the next phase starts only when every task of the current one has
    /// resolved. A failed priority-1 task stops the run after its phase.
    ///
    /// # Errors
    /// Returns `UnknownTaskType` if any task cannot be routed. Nothing is
    /// dispatched in that case.
    pub async fn execute_plan(&mut self, plan: &ExecutionPlan) -> Result<PlanReport> {
        let run_id = RunId::new();
        let start = Instant::now();

        let dispatch = plan
            .phases
            .iter()
            .map(|phase| self.route_all(&phase.tasks))
            .collect::<Result<Vec<_>>>()?;

        // Counted from the phases so a hand-built plan cannot skew the summary.
        let total_tasks = plan.tasks().count();
        tflog!(
            "[{}] Executing plan {} ({} phases, {} tasks)",
            run_id.short(),
            plan.id,
            plan.phase_count(),
            total_tasks
        );

        let mut summary = PlanSummary {
            total_tasks,
            ..PlanSummary::default()
        };
        let mut results = Vec::with_capacity(total_tasks);

        for (phase, groups) in plan.phases.iter().zip(dispatch) {
            self.emit(OrchestratorEvent::PhaseStarted {
                run_id,
                index: phase.index,
                tasks: phase.tasks.iter().map(|t| t.id.clone()).collect(),
            });

            let phase_start = Instant::now();
            let phase_results: Vec<TaskResult> = self
                .run_groups(groups, phase.tasks.len())
                .await
                .into_iter()
                .flatten()
                .collect();
            let duration_ms = elapsed_ms(phase_start);

            let successful = phase_results.iter().filter(|r| r.is_success()).count();
            let failed = phase_results.len() - successful;
            let critical_failures: Vec<TaskId> = phase
                .tasks
                .iter()
                .zip(&phase_results)
                .filter(|(task, result)| task.is_critical() && !result.is_success())
                .map(|(task, _)| task.id.clone())
                .collect();

            tflog_debug!(
                "[{}] Phase {} finished in {}ms: {} succeeded, {} failed",
                run_id.short(),
                phase.index,
                duration_ms,
                successful,
                failed
            );

            summary.successful_tasks += successful;
            summary.failed_tasks += failed;
            summary.phases.push(PhaseReport {
                index: phase.index,
                task_count: phase.tasks.len(),
                successful_tasks: successful,
                failed_tasks: failed,
                duration_ms,
            });
            self.store_results(&phase_results);
            results.extend(phase_results);

            self.emit(OrchestratorEvent::PhaseCompleted {
                run_id,
                index: phase.index,
                duration_ms,
                successful,
                failed,
            });

            if !critical_failures.is_empty() {
                tflog_error!(
                    "[{}] Critical task failed in phase {}: {}; aborting plan {}",
                    run_id.short(),
                    phase.index,
                    critical_failures
                        .iter()
                        .map(|id| id.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    plan.id
                );
                summary.aborted_at_phase = Some(phase.index);
                self.emit(OrchestratorEvent::CriticalFailure {
                    run_id,
                    phase: phase.index,
                    task_ids: critical_failures,
                });
                break;
            }
        }

        summary.skipped_tasks = total_tasks.saturating_sub(results.len());
        summary.total_duration_ms = elapsed_ms(start);

        tflog!(
            "[{}] Plan {} finished: {} succeeded, {} failed, {} skipped in {}ms",
            run_id.short(),
            plan.id,
            summary.successful_tasks,
            summary.failed_tasks,
            summary.skipped_tasks,
            summary.total_duration_ms
        );
        self.emit(OrchestratorEvent::PlanCompleted {
            run_id,
            summary: summary.clone(),
        });

        Ok(PlanReport {
            run_id,
            plan_id: plan.id.clone(),
            results,
            summary,
        })
    }

    /// Execute a single task through the same path as a parallel batch.
    ///
    /// # Errors
    /// Returns `UnknownTaskType` if the task cannot be routed.
    pub async fn execute_task(&mut self, task: Task) -> Result<TaskResult> {
        let id = task.id.clone();
        let report = self.execute_parallel_tasks(vec![task]).await?;
        report
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::Validation(format!("No result produced for task {}", id)))
    }

    /// Execute independent `tasks` as a single phase, consulting the cache.
    ///
    /// Cache hits are reported with worker `"cache"` and zero execution time
    /// and are not counted in worker metrics. Successful executions are
    /// cached for the configured TTL.
    ///
    /// # Errors
    /// Returns `UnknownTaskType` if any task cannot be routed. Nothing is
    /// dispatched in that case.
    pub async fn execute_parallel_tasks(&mut self, tasks: Vec<Task>) -> Result<BatchReport> {
        let start = Instant::now();
        let handles = tasks
            .iter()
            .map(|task| self.router.route(task, &self.pool).cloned())
            .collect::<Result<Vec<_>>>()?;

        if self.config.enable_caching {
            self.purge_expired_cache();
        }

        let mut slots: Vec<Option<TaskResult>> = vec![None; tasks.len()];
        let mut misses = Vec::new();
        for (index, (task, handle)) in tasks.iter().zip(handles).enumerate() {
            let hit = if self.config.enable_caching {
                self.cache.get(task)
            } else {
                None
            };
            match hit {
                Some(data) => {
                    slots[index] = Some(TaskResult::success(task.id.clone(), CACHE_WORKER, data, 0));
                }
                None => misses.push((index, handle)),
            }
        }

        let cached = tasks.len() - misses.len();
        if cached > 0 {
            tflog_debug!("Served {} of {} tasks from cache", cached, tasks.len());
            self.emit(OrchestratorEvent::CacheHits { count: cached });
        }

        let groups = group_by_worker(&tasks, misses);
        let executed = self.run_groups(groups, tasks.len()).await;
        for ((slot, task), result) in slots.iter_mut().zip(&tasks).zip(executed) {
            let Some(result) = result else {
                continue;
            };
            if self.config.enable_caching {
                if let Some(data) = result.data() {
                    self.cache.insert(task, data.clone());
                }
            }
            *slot = Some(result);
        }

        let results: Vec<TaskResult> = slots.into_iter().flatten().collect();
        self.store_results(&results);

        let summary = BatchSummary::from_results(&results, cached, elapsed_ms(start));
        tflog!(
            "Batch finished: {}/{} succeeded ({} cached) in {}ms",
            summary.successful_tasks,
            summary.total_tasks,
            summary.cached_tasks,
            summary.total_duration_ms
        );

        Ok(BatchReport { results, summary })
    }

    /// Route every task and group them by worker in first-appearance order.
    fn route_all(&self, tasks: &[Task]) -> Result<Vec<DispatchGroup>> {
        let routed = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| {
                self.router
                    .route(task, &self.pool)
                    .map(|handle| (index, handle.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(group_by_worker(tasks, routed))
    }

    /// Run every group concurrently and place each result at its task's slot.
    ///
    /// Metrics are recorded once all groups have joined.
    async fn run_groups(
        &mut self,
        groups: Vec<DispatchGroup>,
        slots: usize,
    ) -> Vec<Option<TaskResult>> {
        let batches = join_all(
            groups
                .iter()
                .map(|group| group.handle.process_batch(&group.tasks)),
        )
        .await;

        let mut ordered: Vec<Option<TaskResult>> = vec![None; slots];
        for (group, batch) in groups.iter().zip(batches) {
            for (index, result) in group.indices.iter().zip(batch) {
                self.record_metrics(group.handle.kind(), &result);
                if let Some(slot) = ordered.get_mut(*index) {
                    *slot = Some(result);
                }
            }
        }
        ordered
    }

    fn record_metrics(&mut self, kind: &WorkerKind, result: &TaskResult) {
        if self.config.enable_metrics {
            self.metrics.entry(kind.clone()).or_default().record(result);
        }
    }

    fn store_results(&mut self, results: &[TaskResult]) {
        for result in results {
            self.results.insert(result.task_id.clone(), result.clone());
        }
    }

    // Results

    /// The latest stored result for `id`.
    pub fn result(&self, id: &TaskId) -> Option<&TaskResult> {
        self.results.get(id)
    }

    pub fn results(&self) -> &HashMap<TaskId, TaskResult> {
        &self.results
    }

    /// The stored result for `id` plus the stored results of every
    /// prerequisite declared for it in any stored plan.
    pub fn get_task_result_with_dependencies(&self, id: &TaskId) -> TaskResultWithDependencies {
        let mut dependencies = BTreeMap::new();
        for plan in self.plans.values() {
            let Some(edge) = plan.dependencies_of(id) else {
                continue;
            };
            for required in &edge.required_task_ids {
                if let Some(result) = self.results.get(required) {
                    dependencies.insert(required.clone(), result.clone());
                }
            }
        }

        TaskResultWithDependencies {
            result: self.results.get(id).cloned(),
            dependencies,
        }
    }

    // Metrics and cache

    pub fn metrics(&self, kind: &WorkerKind) -> Option<&WorkerMetrics> {
        self.metrics.get(kind)
    }

    pub fn all_metrics(&self) -> &BTreeMap<WorkerKind, WorkerMetrics> {
        &self.metrics
    }

    /// Zero every worker's counters.
    pub fn reset_metrics(&mut self) {
        for metrics in self.metrics.values_mut() {
            *metrics = WorkerMetrics::default();
        }
        tflog!("Worker metrics reset");
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        tflog!("Result cache cleared");
        self.emit(OrchestratorEvent::CacheCleared);
    }

    /// Evict every expired cache entry, returning how many were removed.
    pub fn purge_expired_cache(&mut self) -> usize {
        let purged = self.cache.purge_expired();
        if purged > 0 {
            tflog_debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("workers", &self.pool.kinds())
            .field("results", &self.results.len())
            .field("plans", &self.plans.len())
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

fn group_by_worker(tasks: &[Task], routed: Vec<(usize, WorkerHandle)>) -> Vec<DispatchGroup> {
    let mut groups: Vec<DispatchGroup> = Vec::new();
    for (index, handle) in routed {
        let Some(task) = tasks.get(index) else {
            continue;
        };
        match groups.iter_mut().find(|g| g.handle.kind() == handle.kind()) {
            Some(group) => {
                group.indices.push(index);
                group.tasks.push(task.clone());
            }
            None => groups.push(DispatchGroup {
                handle,
                indices: vec![index],
                tasks: vec![task.clone()],
            }),
        }
    }
    groups
}
