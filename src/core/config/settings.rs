//! Typed view of `config.yml` merged with `secrets.yaml`.
//!
//! Every section falls back to its defaults, so an empty file yields a
//! working local configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub corpus: CorpusSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub llm: LlmSettings,
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Root of the `<level>/<country>/<school>.pdf` tree.
    pub base_folder: PathBuf,
    /// JSON array of `{url, school, country, level}` entries.
    pub web_manifest: PathBuf,
    pub web_timeout_secs: u64,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            base_folder: PathBuf::from("data/policies"),
            web_manifest: PathBuf::from("data/web.json"),
            web_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub force_rebuild: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/ai_policies_index"),
            chunk_size: 1000,
            chunk_overlap: 100,
            force_rebuild: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Per-passage character budget in the Q&A prompt.
    pub qa_passage_chars: usize,
    /// Per-passage character budget in the policy-drafting prompt.
    pub policy_passage_chars: usize,
    /// Conversation turns folded into the retrieval query.
    pub history_turns: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            qa_passage_chars: 1200,
            policy_passage_chars: 1200,
            history_turns: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    pub temperature: Option<f64>,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 120,
            temperature: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub enabled: bool,
    pub metrics_file: PathBuf,
    /// Fraction of query terms a passage must share to count as precise.
    pub precision_threshold: f64,
    /// Score substituted for any scoring step that fails.
    pub default_score: f64,
    pub queue_capacity: usize,
    pub workers: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_file: PathBuf::from("metrics_log.json"),
            precision_threshold: 0.3,
            default_score: 0.5,
            queue_capacity: 64,
            workers: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_yields_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({})).expect("defaults");
        assert_eq!(settings.retrieval.top_k, 20);
        assert_eq!(settings.index.chunk_size, 1000);
        assert_eq!(settings.index.chunk_overlap, 100);
        assert_eq!(settings.generation.history_turns, 6);
        assert!((settings.evaluation.precision_threshold - 0.3).abs() < f64::EPSILON);
        assert!((settings.evaluation.default_score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({
            "retrieval": { "top_k": 5 },
            "llm": { "chat_model": "local-model" }
        }))
        .expect("partial");
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.llm.chat_model, "local-model");
        assert_eq!(settings.llm.embedding_model, "text-embedding-3-small");
    }
}
