//! REST API routes for the mediator server.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::checkpoint::{CheckpointError, CheckpointInfo};
use crate::experiment::{ExperimentError, ExperimentId, ExperimentStatus};
use crate::models::{ResponseModel, UserData};

use super::state::AppState;

/// Create the API router
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Evaluation traffic
        .route("/user_data", post(receive_user_data))
        .route("/request_new_mediator", post(request_new_mediator))
        .route("/get_first_mediator", get(get_first_mediator))
        // Population control
        .route("/start_evolution", post(start_evolution))
        .route("/restart_population", post(restart_population))
        .route("/reset_experiment", post(reset_experiment))
        .route("/server_status", get(server_status))
        // Checkpoint control
        .route("/checkpoint/save", post(save_checkpoint))
        .route("/checkpoint/load", post(load_checkpoint))
        .route("/checkpoint/list", get(list_checkpoints))
}

/// Error answered as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ExperimentError> for ApiError {
    fn from(e: ExperimentError) -> Self {
        match e {
            ExperimentError::UnknownExperiment(id) => Self::NotFound(format!("Unknown experiment {}", id)),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CheckpointError> for ApiError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(format!("Checkpoint not found: {}", e))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// --- Evaluation ---

async fn receive_user_data(
    State(state): State<Arc<AppState>>,
    Json(user_data): Json<UserData>,
) -> Json<MessageResponse> {
    tokio::spawn(async move {
        if let Err(e) = state.process_user_data(user_data).await {
            log::warn!("User data rejected: {:?}", e);
        }
    });
    message("Data received successfully")
}

async fn request_new_mediator(
    State(state): State<Arc<AppState>>,
    Json(user_data): Json<UserData>,
) -> Result<Json<ResponseModel>, ApiError> {
    log::info!(
        "Requesting new mediator genome for mediator ID: {}",
        user_data.experiment_data.genome_id
    );
    Ok(Json(state.swap_out_mediator(user_data).await?))
}

async fn get_first_mediator(State(state): State<Arc<AppState>>) -> Result<Json<ResponseModel>, ApiError> {
    Ok(Json(state.first_mediator().await?))
}

// --- Population control ---

async fn start_evolution(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    tokio::spawn(async move { state.run_evolution().await });
    message("Evolution process started")
}

async fn restart_population(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    tokio::spawn(async move {
        if let Err(e) = state.reset_population().await {
            log::error!("Population reset failed: {:?}", e);
        }
    });
    message("Population reset")
}

#[derive(Deserialize)]
struct ResetRequest {
    experiment_id: ExperimentId,
}

async fn reset_experiment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.reset_experiment(payload.experiment_id).await?;
    Ok(message("Experiment reset"))
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub experiments: Vec<ExperimentStatus>,
    pub websocket_clients: usize,
}

async fn server_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: crate::VERSION.to_string(),
        experiments: state.statuses().await,
        websocket_clients: state.event_tx.receiver_count(),
    })
}

// --- Checkpoint Control ---

#[derive(Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub success: bool,
    pub paths: Vec<String>,
    pub message: String,
}

async fn save_checkpoint(State(state): State<Arc<AppState>>) -> Result<Json<CheckpointResponse>, ApiError> {
    let paths = state.save_checkpoints().await?;
    Ok(Json(CheckpointResponse {
        success: true,
        message: format!("Saved {} checkpoints", paths.len()),
        paths,
    }))
}

#[derive(Deserialize)]
struct LoadCheckpointRequest {
    path: String,
}

async fn load_checkpoint(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoadCheckpointRequest>,
) -> Result<Json<ExperimentStatus>, ApiError> {
    if payload.path.is_empty() {
        return Err(ApiError::NotFound("No path specified".to_string()));
    }
    Ok(Json(state.load_checkpoint(&payload.path).await?))
}

#[derive(Serialize, Deserialize)]
pub struct CheckpointListResponse {
    pub checkpoints: Vec<CheckpointInfo>,
}

async fn list_checkpoints(State(state): State<Arc<AppState>>) -> Result<Json<CheckpointListResponse>, ApiError> {
    let checkpoints = state.list_checkpoints().await?;
    Ok(Json(CheckpointListResponse { checkpoints }))
}
