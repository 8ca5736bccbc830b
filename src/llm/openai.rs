use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::ChatRequest;

const PROVIDER_NAME: &str = "openai";

/// Client for OpenAI-compatible `/v1/chat/completions` and `/v1/embeddings`.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send_json(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let res = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        res.json().await.map_err(|e| LlmError::Decode {
            provider: PROVIDER_NAME.to_string(),
            message: e.to_string(),
        })
    }
}

fn transport_error(err: reqwest::Error) -> LlmError {
    LlmError::Transport {
        provider: PROVIDER_NAME.to_string(),
        message: err.to_string(),
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, LlmError> {
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        }

        let payload = self.send_json("/v1/chat/completions", &body).await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        Ok(content.to_string())
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let payload = self.send_json("/v1/embeddings", &body).await?;
        let mut response: EmbeddingResponse =
            serde_json::from_value(payload).map_err(|e| LlmError::Decode {
                provider: PROVIDER_NAME.to_string(),
                message: e.to_string(),
            })?;

        // The API may return items out of order; `index` restores input order.
        response
            .data
            .sort_by_key(|item| item.index.unwrap_or(usize::MAX));

        if response.data.len() != inputs.len() {
            return Err(LlmError::Decode {
                provider: PROVIDER_NAME.to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    response.data.len()
                ),
            });
        }

        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new(
            "http://localhost:1234/".to_string(),
            None,
            Duration::from_secs(5),
        )
        .expect("client");
        assert_eq!(provider.base_url, "http://localhost:1234");
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn embedding_items_without_index_keep_order() {
        let mut response: EmbeddingResponse = serde_json::from_value(json!({
            "data": [
                { "embedding": [1.0, 0.0] },
                { "embedding": [0.0, 1.0] }
            ]
        }))
        .expect("decode");
        response.data.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
        assert_eq!(response.data[0].embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_openai_connection() {
        let key = std::env::var("OPENAI_API_KEY").ok();
        let provider = OpenAiProvider::new(
            "https://api.openai.com".to_string(),
            key,
            Duration::from_secs(30),
        )
        .expect("client");

        let reply = provider
            .chat(ChatRequest::prompt("Reply with the word ok."), "gpt-4o-mini")
            .await;
        match reply {
            Ok(text) => println!("OpenAI chat response: {}", text),
            Err(e) => panic!("Failed to reach OpenAI: {}", e),
        }
    }
}
