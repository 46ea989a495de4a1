//! Route handlers

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod task;

/// All REST routes, before middleware
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(task::router())
}
