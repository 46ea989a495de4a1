//! Root and health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tasky_core::task::TaskRepository;

use super::task::{error_response, ApiError};
use crate::state::AppState;

#[derive(Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    tasks_file: String,
    task_count: usize,
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Task Board API!",
    })
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.task_store();
    let task_count = store.list().await.map_err(error_response)?.len();

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tasks_file: store.path().to_string_lossy().to_string(),
        task_count,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
