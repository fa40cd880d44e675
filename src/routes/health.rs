//! Liveness and readiness routes.
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use crate::{db, state::AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/check-status", get(check_status))
}

async fn root() -> Json<Value> {
    Json(json!({"message": "Bite Me Buddy API is running!"}))
}

/// Report whether the database is reachable.
async fn check_status(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"message": "Database connection successful!"})),
        ),
        Err(err) => {
            error!("Database health check failed: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"message": format!("Database error: {err}")})),
            )
        }
    }
}
