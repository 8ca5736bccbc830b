//! Deterministic model provider and corpus fixtures shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use policy_backend::core::config::{AppPaths, AppSettings};
use policy_backend::ingest::{DocumentMetadata, SourceDocument};
use policy_backend::llm::{ChatRequest, LlmError, LlmProvider, LlmService};
use policy_backend::state::AppState;

const DIMENSION: usize = 512;

/// Embeds with hashed bag-of-words counts and answers by citing the first
/// passage header found in the prompt.
pub struct StubProvider {
    pub fail_chat: bool,
}

pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() as usize) % DIMENSION] += 1.0;
    }
    vector
}

fn header_value<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .map(str::trim)
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn health_check(&self) -> bool {
        !self.fail_chat
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, LlmError> {
        if self.fail_chat {
            return Err(LlmError::Status {
                provider: "stub".to_string(),
                status: 503,
                body: "overloaded".to_string(),
            });
        }

        let prompt = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if prompt.contains("Return only a number") {
            return Ok("8".to_string());
        }

        let country = header_value(prompt, "Country:").unwrap_or("an unknown country");
        let school = header_value(prompt, "School:").unwrap_or("an unknown school");
        Ok(format!(
            "According to {} in {}, AI tools may be used under teacher supervision.",
            school, country
        ))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(inputs.iter().map(|text| embed(text)).collect())
    }
}

pub fn llm(fail_chat: bool) -> LlmService {
    LlmService::new(Arc::new(StubProvider { fail_chat }), "stub-chat", "stub-embed")
}

pub fn document(school: &str, country: &str, level: &str, text: &str) -> SourceDocument {
    SourceDocument {
        text: text.to_string(),
        metadata: DocumentMetadata {
            school: school.to_string(),
            country: country.to_string(),
            level: level.to_string(),
            source: format!("{}/{}/{}.pdf", level, country, school),
        },
    }
}

pub fn corpus() -> Vec<SourceDocument> {
    vec![
        document(
            "Ecole Jules Ferry",
            "France",
            "primary",
            "Primary school pupils in France may use AI tools only under teacher supervision.",
        ),
        document(
            "Tokyo High",
            "Japan",
            "secondary",
            "Secondary students in Japan must obtain approval before using generative AI.",
        ),
    ]
}

pub async fn app_state(dir: &Path, fail_chat: bool) -> Arc<AppState> {
    let paths = AppPaths::with_dirs(dir.to_path_buf(), dir.join("data"));
    AppState::assemble(&paths, AppSettings::default(), llm(fail_chat), &corpus())
        .await
        .expect("state")
}
