use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn summary(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.metrics.summarize().await?;
    Ok(Json(summary))
}

pub async fn raw(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let log = state.metrics.raw().await?;
    Ok(Json(log))
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.metrics.clear().await?;
    tracing::info!("Metrics log cleared");
    Ok(Json(json!({ "message": "Metrics cleared successfully" })))
}
