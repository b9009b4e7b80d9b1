//! Chunked concurrency, cross-worker parallelism and timeouts.

use std::time::{Duration, Instant};
use tokio_test::assert_ok;

use taskforge::core::task::Task;
use taskforge::orchestration::{WorkerConfig, WorkerKind};

use crate::fixtures::{fetch, orchestrator_with, slow, validate, MockWorker};

#[tokio::test]
async fn test_chunking_bounds_in_flight_tasks() {
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_config(WorkerConfig::default().with_max_concurrent(2))
        .with_delay(Duration::from_millis(20))
        .build();
    let mut orchestrator = orchestrator_with(&[api.clone()]);
    let tasks: Vec<Task> = (0..5).map(|i| fetch(&format!("f{}", i))).collect();

    let report = assert_ok!(orchestrator.submit(tasks, &[]).await);

    assert_eq!(report.summary.successful_tasks, 5);
    assert_eq!(api.calls(), 5);
    assert_eq!(api.peak(), 2);
}

#[tokio::test]
async fn test_serialized_worker_does_not_hold_back_others() {
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_config(WorkerConfig::default().with_max_concurrent(1))
        .with_delay(Duration::from_millis(100))
        .build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy)
        .with_delay(Duration::from_millis(10))
        .build();
    let mut orchestrator = orchestrator_with(&[api.clone(), accuracy.clone()]);

    let start = Instant::now();
    let report = assert_ok!(
        orchestrator
            .submit(vec![fetch("f1"), fetch("f2"), validate("v1")], &[])
            .await
    );
    let elapsed = start.elapsed();

    assert_eq!(report.summary.phases.len(), 1);
    assert_eq!(report.summary.successful_tasks, 3);
    assert!(elapsed >= Duration::from_millis(200), "took {:?}", elapsed);
    assert_eq!(api.peak(), 1);

    let validated = accuracy.finished_at("v1").unwrap();
    let first_fetch = api.finished_at("f1").unwrap();
    assert!(validated < first_fetch);
    assert!(report.result(&"v1".into()).unwrap().execution_time_ms < 100);
}

#[tokio::test]
async fn test_workers_in_same_phase_run_concurrently() {
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_delay(Duration::from_millis(100))
        .build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy)
        .with_delay(Duration::from_millis(100))
        .build();
    let mut orchestrator = orchestrator_with(&[api, accuracy]);

    let start = Instant::now();
    let report = assert_ok!(
        orchestrator
            .execute_parallel_tasks(vec![fetch("f1"), validate("v1")])
            .await
    );

    assert_eq!(report.summary.successful_tasks, 2);
    assert!(start.elapsed() < Duration::from_millis(190));
}

#[tokio::test]
async fn test_next_phase_waits_for_previous() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let accuracy = MockWorker::new(WorkerKind::DataAccuracy).build();
    let mut orchestrator = orchestrator_with(&[api.clone(), accuracy.clone()]);

    assert_ok!(
        orchestrator
            .submit(
                vec![slow(fetch("f1"), 60), fetch("f2"), validate("v1")],
                &[taskforge::DependencyEdge::new("v1", ["f2"])],
            )
            .await
    );

    let slowest_fetch = api.finished_at("f1").unwrap();
    let validated = accuracy.finished_at("v1").unwrap();
    assert!(validated > slowest_fetch);
}

#[tokio::test]
async fn test_task_timeout_becomes_failed_result() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let mut orchestrator = orchestrator_with(&[api]);
    let task = slow(fetch("hang"), 500).with_timeout(Duration::from_millis(30));

    let start = Instant::now();
    let result = assert_ok!(orchestrator.execute_task(task).await);

    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(!result.is_success());
    let error = result.error().unwrap();
    assert!(error.contains("hang"), "unexpected error: {}", error);
    assert!(error.contains("timed out"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_worker_timeout_default_applies() {
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_config(WorkerConfig::default().with_timeout(Duration::from_millis(30)))
        .build();
    let mut orchestrator = orchestrator_with(&[api]);

    let report = assert_ok!(
        orchestrator
            .execute_parallel_tasks(vec![slow(fetch("hang"), 500), fetch("quick")])
            .await
    );

    assert_eq!(report.summary.failed_tasks, 1);
    assert_eq!(report.summary.successful_tasks, 1);
    assert!(!report.results[0].is_success());
    assert!(report.results[1].is_success());
}

#[tokio::test]
async fn test_worker_error_message_preserved() {
    let api = MockWorker::new(WorkerKind::ApiIntegration).build();
    let mut orchestrator = orchestrator_with(&[api]);

    let result = assert_ok!(
        orchestrator
            .execute_task(crate::fixtures::failing(fetch("bad")))
            .await
    );

    assert_eq!(result.error(), Some("api-integration could not process bad"));
    let metrics = orchestrator.metrics(&WorkerKind::ApiIntegration).unwrap();
    assert_eq!(metrics.failed_tasks, 1);
    assert_eq!(metrics.error_rate, 1.0);
}
