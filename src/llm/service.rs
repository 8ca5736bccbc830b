use std::sync::Arc;
use std::time::Duration;

use crate::core::config::LlmSettings;
use crate::llm::error::LlmError;
use crate::llm::openai::OpenAiProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::types::ChatRequest;

/// A provider bound to the deployment's chat and embedding models.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    chat_model: String,
    embedding_model: String,
    temperature: Option<f64>,
}

impl LlmService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            temperature: None,
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        if settings.api_key.is_none() {
            tracing::warn!("No LLM API key configured; requests to {} are unauthenticated", settings.base_url);
        }
        let provider = OpenAiProvider::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?;
        let mut service = Self::new(
            Arc::new(provider),
            settings.chat_model.clone(),
            settings.embedding_model.clone(),
        );
        service.temperature = settings.temperature;
        Ok(service)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    /// Sends a single-turn prompt to the chat model.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest::prompt(prompt).with_temperature(self.temperature);
        self.provider.chat(request, &self.chat_model).await
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.provider.embed(inputs, &self.embedding_model).await
    }

    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        vectors.pop().ok_or_else(|| LlmError::EmptyResponse {
            provider: self.provider.name().to_string(),
        })
    }
}
