//! In-process provider for unit tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::LlmError;
use super::provider::LlmProvider;
use super::service::LlmService;
use super::types::ChatRequest;

pub const FAKE_DIMENSION: usize = 256;

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

pub struct FakeProvider {
    responder: Responder,
    fail_embed: bool,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with_reply(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::with_responder(move |_| Ok(reply.clone()))
    }

    pub fn with_responder(
        responder: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            fail_embed: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let mut provider = Self::with_responder(|_| Err(unavailable()));
        provider.fail_embed = true;
        provider
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn service(self: &Arc<Self>) -> LlmService {
        LlmService::new(self.clone(), "fake-chat", "fake-embed")
    }
}

/// Hashed bag-of-words vector; texts sharing words point the same way.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; FAKE_DIMENSION];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() as usize) % FAKE_DIMENSION] += 1.0;
    }
    vector
}

fn unavailable() -> LlmError {
    LlmError::Transport {
        provider: "fake".to_string(),
        message: "unavailable".to_string(),
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> bool {
        !self.fail_embed
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        (self.responder)(&prompt)
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        if self.fail_embed {
            return Err(unavailable());
        }
        Ok(inputs.iter().map(|text| bag_of_words(text)).collect())
    }
}
