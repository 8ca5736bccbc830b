use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::core::errors::ApiError;
use crate::generation::{PolicyDraft, PolicyRequest};
use crate::state::AppState;

pub async fn generate_policy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PolicyRequest>,
) -> Result<Json<PolicyDraft>, ApiError> {
    for (field, value) in [
        ("school", &request.school),
        ("country", &request.country),
        ("level", &request.level),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
        }
    }

    let draft = state.assistant.generate_policy(&request).await.map_err(|err| {
        tracing::error!("Failed to generate policy for {}: {}", request.school, err);
        ApiError::from(err)
    })?;

    Ok(Json(draft))
}
