//! Route tests for the mediator server

#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use neuroevolution::config::Config;
use neuroevolution::experiment::{ExperimentConfig, ExperimentStatus};
use neuroevolution::lab::Lab;
use neuroevolution::models::{ExperimentData, ResponseModel, UserData};
use neuroevolution::web::{app, AppState, CheckpointListResponse, CheckpointResponse, StatusResponse};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_state(dir: &TempDir) -> Arc<AppState> {
    test_state_with(dir, Config::default())
}

fn test_state_with(dir: &TempDir, mut config: Config) -> Arc<AppState> {
    config.storage.session_file = dir.path().join("sessions.csv");
    config.storage.checkpoint_dir = dir.path().join("checkpoints");

    let mut lab = Lab::with_seed(1);
    lab.add_simple_experiment(ExperimentConfig {
        pop_size: Some(10),
        seed: Some(3),
        ..ExperimentConfig::default()
    })
    .unwrap();
    lab.instantiate_experiments().unwrap();

    Arc::new(AppState::with_lab(config, lab).unwrap())
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Rate `experiment_data` and return the replacement mediator
async fn evaluate_mediator(state: &Arc<AppState>, experiment_data: ExperimentData, rating: i32) -> ResponseModel {
    let data = UserData {
        experiment_data,
        time_since_startup: 30.0 * rating as f64,
        user_rating: rating,
        ..UserData::default()
    };
    let (status, body) = send(
        state,
        post("/request_new_mediator", serde_json::to_value(&data).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

/// Poll the first experiment's status until `done` holds
async fn wait_for(state: &Arc<AppState>, done: impl Fn(&ExperimentStatus) -> bool) -> ExperimentStatus {
    for _ in 0..200 {
        let status = state.statuses().await.remove(0);
        if done(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("experiment never reached the expected state");
}

#[tokio::test]
async fn test_first_mediator() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (status, body) = send(&state, get("/get_first_mediator")).await;
    assert_eq!(status, StatusCode::OK);

    let response: ResponseModel = serde_json::from_value(body).unwrap();
    assert_eq!(response.phenotype.experiment_data.experiment_id, 0);
    assert!(response.phenotype.experiment_data.genome_id > 0);
    assert!(!response.phenotype.new_mediator.is_empty());
}

#[tokio::test]
async fn test_swap_out_mediator_records_evaluation() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (_, body) = send(&state, get("/get_first_mediator")).await;
    let first: ResponseModel = serde_json::from_value(body).unwrap();

    let data = UserData {
        experiment_data: first.phenotype.experiment_data,
        time_since_startup: 120.0,
        user_rating: 4,
        ..UserData::default()
    };
    let (status, body) = send(
        &state,
        post("/request_new_mediator", serde_json::to_value(&data).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "New mediator generated successfully");

    let statuses = state.statuses().await;
    assert_eq!(statuses[0].evaluated_count, 1);
    assert!(dir.path().join("sessions.csv").exists());
}

#[tokio::test]
async fn test_unknown_experiment_is_not_found() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let data = json!({
        "experiment_data": {"experiment_id": 99, "genome_id": 1},
        "time_since_startup": 1.0,
        "user_rating": 3
    });
    let (status, body) = send(&state, post("/request_new_mediator", data)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("99"));

    let (status, _) = send(&state, post("/reset_experiment", json!({"experiment_id": 99}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_data_is_acknowledged() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let data = json!({
        "experiment_data": {"experiment_id": 0, "genome_id": 0},
        "time_since_startup": 1.0,
        "user_rating": 3
    });
    let (status, body) = send(&state, post("/user_data", data)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data received successfully");
}

#[tokio::test]
async fn test_server_status() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (status, body) = send(&state, get("/server_status")).await;
    assert_eq!(status, StatusCode::OK);

    let response: StatusResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.version, neuroevolution::VERSION);
    assert_eq!(response.experiments.len(), 1);
    assert_eq!(response.experiments[0].population_size, 10);
    assert_eq!(response.experiments[0].generation, 0);
}

#[tokio::test]
async fn test_reset_experiment() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (status, body) = send(&state, post("/reset_experiment", json!({"experiment_id": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Experiment reset");
    assert_eq!(state.statuses().await[0].evaluated_count, 0);
}

#[tokio::test]
async fn test_checkpoint_save_list_load() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (status, body) = send(&state, post("/checkpoint/save", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let saved: CheckpointResponse = serde_json::from_value(body).unwrap();
    assert!(saved.success);
    assert_eq!(saved.paths.len(), 1);

    let (status, body) = send(&state, get("/checkpoint/list")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: CheckpointListResponse = serde_json::from_value(body).unwrap();
    assert_eq!(listed.checkpoints.len(), 1);
    assert_eq!(listed.checkpoints[0].experiment_id, 0);

    let (status, body) = send(&state, post("/checkpoint/load", json!({"path": saved.paths[0]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["population_size"], 10);

    let missing = dir.path().join("missing.bin").display().to_string();
    let (status, _) = send(&state, post("/checkpoint/load", json!({"path": missing}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_evolution_advances_generation() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (_, body) = send(&state, get("/get_first_mediator")).await;
    let first: ResponseModel = serde_json::from_value(body).unwrap();
    evaluate_mediator(&state, first.phenotype.experiment_data, 4).await;
    assert_eq!(state.statuses().await[0].generation, 0);

    let (status, body) = send(&state, post("/start_evolution", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Evolution process started");

    let advanced = wait_for(&state, |s| s.generation == 1).await;
    assert_eq!(advanced.population_size, 10);
}

#[tokio::test]
async fn test_restart_population_clears_evaluations() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let (_, body) = send(&state, get("/get_first_mediator")).await;
    let first: ResponseModel = serde_json::from_value(body).unwrap();
    evaluate_mediator(&state, first.phenotype.experiment_data, 2).await;
    assert_eq!(state.statuses().await[0].evaluated_count, 1);

    let (status, body) = send(&state, post("/restart_population", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Population reset");

    let reset = wait_for(&state, |s| s.evaluated_count == 0).await;
    assert_eq!(reset.generation, 0);
    assert_eq!(reset.population_size, 10);
}

#[tokio::test]
async fn test_generation_advance_writes_periodic_checkpoint() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.logging.checkpoint_interval = 1;
    let state = test_state_with(&dir, config);

    let (_, body) = send(&state, get("/get_first_mediator")).await;
    let mut mediator: ResponseModel = serde_json::from_value(body).unwrap();
    for rating in 0..40 {
        if state.statuses().await[0].generation >= 1 {
            break;
        }
        mediator = evaluate_mediator(&state, mediator.phenotype.experiment_data, rating % 5).await;
    }
    assert!(state.statuses().await[0].generation >= 1);

    assert!(dir.path().join("checkpoints/checkpoint_e000_g000001.bin").exists());
    let (status, body) = send(&state, get("/checkpoint/list")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: CheckpointListResponse = serde_json::from_value(body).unwrap();
    assert!(listed.checkpoints.iter().any(|c| c.generation == 1));
}

#[tokio::test]
async fn test_concurrent_user_data_writes_one_header() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    let writes = (0..8).map(|i| {
        let state = state.clone();
        tokio::spawn(async move {
            let data = UserData {
                experiment_data: ExperimentData {
                    experiment_id: 0,
                    genome_id: 1000 + i,
                },
                time_since_startup: 1.0,
                user_rating: 1,
                ..UserData::default()
            };
            state.process_user_data(data).await
        })
    });
    for write in futures::future::join_all(writes).await {
        write.unwrap().unwrap();
    }

    let text = std::fs::read_to_string(dir.path().join("sessions.csv")).unwrap();
    let headers = text.lines().filter(|l| l.starts_with("experiment_id")).count();
    assert_eq!(headers, 1);
    assert_eq!(text.lines().count(), 9);
}
