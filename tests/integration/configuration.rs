//! Configuration files driving the orchestrator.

use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

use taskforge::config::Config;
use taskforge::core::task::Task;
use taskforge::orchestration::{Orchestrator, WorkerConfig, WorkerKind};

use crate::fixtures::MockWorker;

const CONFIG: &str = r#"
[orchestrator]
enable_caching = false
estimate_routed_ms = 2000

[workers.api-integration]
max_concurrent = 1
timeout_ms = 250

[routes]
zoning-lookup = "api-integration"
geocode = "geocoder"
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("taskforge.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[test]
fn test_config_file_parsed() {
    let dir = TempDir::new().unwrap();
    let config = assert_ok!(Config::load_from(&write_config(&dir)));

    assert!(!config.orchestrator.enable_caching);
    assert!(config.orchestrator.enable_metrics);
    assert_eq!(config.orchestrator.estimate_routed_ms, 2000);
    assert_eq!(
        config.routes.get("geocode"),
        Some(&WorkerKind::Custom("geocoder".to_string()))
    );

    let api = config.worker_config(&WorkerKind::ApiIntegration, WorkerConfig::default());
    assert_eq!(api.max_concurrent, 1);
    assert_eq!(api.timeout, Duration::from_millis(250));
    assert_eq!(api.retry_attempts, 3);
}

#[tokio::test]
async fn test_orchestrator_from_config_uses_routes_and_switches() {
    let dir = TempDir::new().unwrap();
    let config = assert_ok!(Config::load_from(&write_config(&dir)));
    let geocoder = MockWorker::new(WorkerKind::Custom("geocoder".to_string())).build();
    let api = MockWorker::new(WorkerKind::ApiIntegration)
        .with_config(config.worker_config(&WorkerKind::ApiIntegration, WorkerConfig::default()))
        .build();
    let mut orchestrator = Orchestrator::from_config(&config);
    orchestrator.register_worker(geocoder.clone());
    orchestrator.register_worker(api.clone());

    let geocode = || Task::new("g", "geocode").with_payload(json!({ "address": "1 Ocean Dr" }));
    let zoning = Task::new("z", "zoning-lookup").with_payload(json!({ "parcel": 42 }));

    let plan = assert_ok!(orchestrator.create_plan(vec![geocode(), zoning], &[]));
    assert_eq!(plan.estimated_duration, Duration::from_secs(2));

    let first = assert_ok!(orchestrator.execute_plan(&plan).await);
    assert_eq!(first.summary.successful_tasks, 2);
    assert_eq!(first.result(&"g".into()).unwrap().worker, "geocoder");
    assert_eq!(first.result(&"z".into()).unwrap().worker, "api-integration");

    // Caching is disabled in the file, so repeated work always executes.
    assert_ok!(orchestrator.execute_parallel_tasks(vec![geocode()]).await);
    assert_ok!(orchestrator.execute_parallel_tasks(vec![geocode()]).await);
    assert_eq!(geocoder.calls(), 3);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();

    let config = assert_ok!(Config::load_from(&dir.path().join("absent.toml")));

    assert_eq!(config, Config::default());
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("taskforge.toml");
    let mut config = Config::default();
    config
        .routes
        .insert("permit-check".to_string(), WorkerKind::DocumentProcessing);

    assert_ok!(config.save_to(&path));
    let loaded = assert_ok!(Config::load_from(&path));

    assert_eq!(loaded, config);
}
