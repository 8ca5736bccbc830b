use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::ConversationTurn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub history: Option<Vec<ConversationTurn>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let history = payload.history.unwrap_or_default();
    let qa = state.assistant.ask(&payload.question, &history).await.map_err(|err| {
        tracing::error!("Failed to answer question: {}", err);
        ApiError::from(err)
    })?;

    Ok(Json(QueryResponse { answer: qa.answer }))
}
