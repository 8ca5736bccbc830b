use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::llm::LlmService;

/// A single scoring step that could not produce a value.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("model call failed: {0}")]
    Model(String),
    #[error("could not parse score from {0:?}")]
    Unparseable(String),
    #[error("evaluation library failed: {0}")]
    Library(String),
}

pub type Score = Result<f64, EvalError>;

/// Reference scorer for the model-judged axes.
#[async_trait]
pub trait ReferenceEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn faithfulness(&self, answer: &str, contexts: &[String]) -> Score;

    async fn answer_relevancy(&self, query: &str, answer: &str) -> Score;

    /// Any further metrics the evaluator reports; they join the aggregate.
    async fn extra_metrics(
        &self,
        _query: &str,
        _answer: &str,
        _contexts: &[String],
    ) -> Result<BTreeMap<String, f64>, EvalError> {
        Ok(BTreeMap::new())
    }
}

/// Maps failed scoring steps to a fixed default and remembers which ones
/// degraded.
#[derive(Debug, Clone, Copy)]
pub struct ScorePolicy {
    pub default_score: f64,
}

impl ScorePolicy {
    pub fn new(default_score: f64) -> Self {
        Self { default_score }
    }

    pub fn resolve(&self, metric: &str, score: Score, degraded: &mut Vec<String>) -> f64 {
        match score {
            Ok(value) => value.clamp(0.0, 1.0),
            Err(err) => {
                tracing::warn!(
                    "Evaluation degraded: {} fell back to {}: {}",
                    metric,
                    self.default_score,
                    err
                );
                degraded.push(metric.to_string());
                self.default_score
            }
        }
    }
}

/// Uses the chat model as a judge, asking for 1-10 ratings.
pub struct LlmJudge {
    llm: LlmService,
}

impl LlmJudge {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    async fn rate(&self, prompt: String) -> Score {
        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| EvalError::Model(e.to_string()))?;
        parse_rating(&reply)
    }
}

#[async_trait]
impl ReferenceEvaluator for LlmJudge {
    fn name(&self) -> &str {
        "llm-judge"
    }

    async fn faithfulness(&self, answer: &str, contexts: &[String]) -> Score {
        self.rate(faithfulness_prompt(answer, &contexts.join("\n\n"))).await
    }

    async fn answer_relevancy(&self, query: &str, answer: &str) -> Score {
        self.rate(relevancy_prompt(query, answer)).await
    }
}

fn faithfulness_prompt(answer: &str, context: &str) -> String {
    format!(
        "Rate how faithful this answer is to the provided context (1-10 scale):\n\n\
         Context: {context}\n\n\
         Answer: {answer}\n\n\
         Instructions:\n\
         - 1-3: Answer contains information not in context or contradicts context\n\
         - 4-6: Answer partially faithful but has some unsupported claims\n\
         - 7-8: Answer mostly faithful with minor deviations\n\
         - 9-10: Answer completely faithful to context\n\n\
         Return only a number from 1-10:"
    )
}

fn relevancy_prompt(query: &str, answer: &str) -> String {
    format!(
        "Rate how directly this answer addresses the question (1-10 scale):\n\n\
         Question: {query}\n\n\
         Answer: {answer}\n\n\
         Instructions:\n\
         - 1-3: Answer is off-topic or evasive\n\
         - 4-6: Answer is related but leaves the question partly unanswered\n\
         - 7-8: Answer addresses the question with minor gaps\n\
         - 9-10: Answer fully and directly addresses the question\n\n\
         Return only a number from 1-10:"
    )
}

/// Pulls the first number out of a judge reply and maps 1-10 onto 0-1.
pub fn parse_rating(reply: &str) -> Score {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

    let rating: f64 = number
        .find(reply)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| EvalError::Unparseable(reply.trim().to_string()))?;
    Ok(rating.clamp(1.0, 10.0) / 10.0)
}
