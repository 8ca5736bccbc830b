use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures of the retrieval pipeline itself: ingestion, the index snapshot,
/// and the model calls that produce the primary answer.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to ingest {document}: {message}")]
    Ingestion { document: String, message: String },
    #[error("corrupt index snapshot: {0}")]
    CorruptIndex(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("metrics log error: {0}")]
    MetricsLog(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn ingestion(document: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RagError::Ingestion {
            document: document.into(),
            message: err.to_string(),
        }
    }

    pub fn corrupt<E: std::fmt::Display>(err: E) -> Self {
        RagError::CorruptIndex(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Generation(_) | RagError::Embedding(_) => ApiError::Upstream(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failures_map_to_bad_gateway() {
        let api: ApiError = RagError::Generation("timeout".to_string()).into();
        assert!(matches!(api, ApiError::Upstream(_)));
        assert_eq!(api.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn ingestion_error_names_the_document() {
        let err = RagError::ingestion("primary/France/Ecole.pdf", "no text layer");
        assert!(matches!(err, RagError::Ingestion { ref document, .. } if document == "primary/France/Ecole.pdf"));
        assert_eq!(
            err.to_string(),
            "failed to ingest primary/France/Ecole.pdf: no text layer"
        );
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn corrupt_index_maps_to_internal() {
        let api: ApiError = RagError::corrupt("bad manifest").into();
        assert!(matches!(api, ApiError::Internal(ref msg) if msg.contains("bad manifest")));
    }
}
