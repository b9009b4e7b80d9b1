//! Results table semantics and dependency-aware lookups.

use serde_json::json;
use tokio_test::assert_ok;

use taskforge::core::task::{DependencyEdge, TaskId};
use taskforge::orchestration::WorkerKind;

use crate::fixtures::{failing, fetch, orchestrator_with, validate, MockWorker};

#[tokio::test]
async fn test_fetch_validate_scenario() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy).build();
    let mut orchestrator = orchestrator_with(&[api, accuracy]);

    let plan = assert_ok!(orchestrator.create_plan(
        vec![fetch("A"), validate("B"), fetch("C")],
        &[DependencyEdge::new("B", ["A"])],
    ));
    let phases: Vec<Vec<&str>> = plan
        .phases
        .iter()
        .map(|p| p.tasks.iter().map(|t| t.id.as_str()).collect())
        .collect();
    assert_eq!(phases, vec![vec!["A", "C"], vec!["B"]]);

    let report = assert_ok!(orchestrator.execute_plan(&plan).await);
    assert_eq!(report.summary.successful_tasks, 3);
    assert_eq!(report.plan_id, plan.id);

    let lookup = orchestrator.get_task_result_with_dependencies(&TaskId::from("B"));
    assert_eq!(lookup.result.unwrap().worker, "data-accuracy");
    assert_eq!(lookup.dependencies.len(), 1);
    let a = &lookup.dependencies[&TaskId::from("A")];
    assert_eq!(a.data().unwrap()["input"], json!({ "source": "A" }));
}

#[tokio::test]
async fn test_rerun_overwrites_result() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let mut orchestrator = orchestrator_with(&[api]);

    let first = assert_ok!(orchestrator.submit(vec![failing(fetch("job"))], &[]).await);
    assert!(!first.results[0].is_success());
    assert!(!orchestrator.result(&TaskId::from("job")).unwrap().is_success());

    assert_ok!(orchestrator.submit(vec![fetch("job")], &[]).await);

    let stored = orchestrator.result(&TaskId::from("job")).unwrap();
    assert!(stored.is_success());
    assert_eq!(orchestrator.results().len(), 1);
}

#[tokio::test]
async fn test_each_run_gets_fresh_run_id() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let mut orchestrator = orchestrator_with(&[api]);
    let plan = assert_ok!(orchestrator.create_plan(vec![fetch("a")], &[]));

    let first = assert_ok!(orchestrator.execute_plan(&plan).await);
    let second = assert_ok!(orchestrator.execute_plan(&plan).await);

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.plan_id, second.plan_id);
}

#[tokio::test]
async fn test_dependency_lookup_omits_missing_results() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy).build();
    let mut orchestrator = orchestrator_with(&[api, accuracy]);

    // Planned but never executed.
    assert_ok!(orchestrator.create_plan(
        vec![fetch("A"), validate("B")],
        &[DependencyEdge::new("B", ["A"])],
    ));

    let lookup = orchestrator.get_task_result_with_dependencies(&TaskId::from("B"));
    assert!(lookup.result.is_none());
    assert!(lookup.dependencies.is_empty());
}

#[tokio::test]
async fn test_metrics_accumulate_across_runs() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let mut orchestrator = orchestrator_with(&[api]);

    assert_ok!(orchestrator.submit(vec![fetch("a"), failing(fetch("b"))], &[]).await);
    assert_ok!(orchestrator.submit(vec![fetch("c"), fetch("d")], &[]).await);

    let metrics = orchestrator.metrics(&WorkerKind::ApiIntegration).unwrap();
    assert_eq!(metrics.total_tasks, 4);
    assert_eq!(metrics.successful_tasks, 3);
    assert_eq!(metrics.failed_tasks, 1);
    assert_eq!(metrics.error_rate, 0.25);
    assert!(metrics.last_execution_time_ms.is_some());

    orchestrator.reset_metrics();
    assert_eq!(
        orchestrator
            .metrics(&WorkerKind::ApiIntegration)
            .unwrap()
            .total_tasks,
        0
    );
}

#[tokio::test]
async fn test_worker_statuses_report_config_and_metrics() {
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_config(taskforge::WorkerConfig::default().with_max_concurrent(3))
        .build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy).build();
    let mut orchestrator = orchestrator_with(&[api, accuracy]);
    assert_ok!(orchestrator.execute_task(fetch("a")).await);

    let statuses = orchestrator.worker_statuses();

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].kind, WorkerKind::DataAccuracy);
    assert_eq!(statuses[1].kind, WorkerKind::ApiIntegration);
    assert_eq!(statuses[1].max_concurrent, 3);
    assert_eq!(statuses[1].metrics.as_ref().unwrap().total_tasks, 1);
}
