use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {provider} failed: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned no content")]
    EmptyResponse { provider: String },
    #[error("unexpected response from {provider}: {message}")]
    Decode { provider: String, message: String },
}
