use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Reports the loaded index and whether the model provider answers.
///
/// An unreachable provider is reported as `degraded` rather than failing
/// the request.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let llm_reachable = state.llm.health_check().await;
    if !llm_reachable {
        tracing::warn!("LLM provider {} is unreachable", state.llm.provider_name());
    }

    Json(json!({
        "status": if llm_reachable { "ok" } else { "degraded" },
        "passages": state.assistant.retriever().index().len(),
        "top_k": state.assistant.retriever().top_k(),
        "llm_provider": state.llm.provider_name(),
        "llm_reachable": llm_reachable,
        "evaluation_enabled": state.evaluation.is_some(),
    }))
}
