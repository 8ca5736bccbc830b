use serde::{Deserialize, Serialize};

use super::prompt::{build_context, policy_prompt, qa_prompt, PolicyPromptFields};
use crate::core::config::GenerationSettings;
use crate::core::errors::RagError;
use crate::llm::LlmService;
use crate::rag::{PassageMetadata, RetrievalResult};

#[derive(Debug, Clone)]
pub struct QaAnswer {
    pub answer: String,
    pub passages: RetrievalResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub school: String,
    pub country: String,
    pub level: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
}

impl PolicyRequest {
    /// Retrieval query used to gather comparable policies.
    pub fn retrieval_query(&self) -> String {
        format!("AI policy for {} schools in {}", self.level, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub school: String,
    pub country: String,
    pub level: String,
    pub requirements: Option<String>,
    pub scope: Vec<String>,
    pub retrieved_sources: Vec<PassageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub generated_policy: String,
    pub metadata: PolicyMetadata,
}

/// Turns retrieved passages into a grounded answer or policy draft with a
/// single model call. Model failures surface as [`RagError::Generation`].
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: LlmService,
    qa_passage_chars: usize,
    policy_passage_chars: usize,
}

impl AnswerGenerator {
    pub fn new(llm: LlmService, settings: &GenerationSettings) -> Self {
        Self {
            llm,
            qa_passage_chars: settings.qa_passage_chars,
            policy_passage_chars: settings.policy_passage_chars,
        }
    }

    pub async fn answer(&self, question: &str, passages: RetrievalResult) -> Result<QaAnswer, RagError> {
        let context = build_context(&passages, self.qa_passage_chars);
        let answer = self.invoke(&qa_prompt(&context, question)).await?;
        Ok(QaAnswer { answer, passages })
    }

    pub async fn draft_policy(
        &self,
        request: &PolicyRequest,
        passages: &RetrievalResult,
    ) -> Result<PolicyDraft, RagError> {
        let scope = request.scope.clone().unwrap_or_default();
        let context = build_context(passages, self.policy_passage_chars);
        let prompt = policy_prompt(
            &PolicyPromptFields {
                school: &request.school,
                country: &request.country,
                level: &request.level,
                requirements: request.requirements.as_deref(),
                scope: &scope,
            },
            &context,
        );
        let generated_policy = self.invoke(&prompt).await?;

        Ok(PolicyDraft {
            generated_policy,
            metadata: PolicyMetadata {
                school: request.school.clone(),
                country: request.country.clone(),
                level: request.level.clone(),
                requirements: request.requirements.clone(),
                scope,
                retrieved_sources: passages.iter().map(|p| p.passage.metadata.clone()).collect(),
            },
        })
    }

    async fn invoke(&self, prompt: &str) -> Result<String, RagError> {
        self.llm
            .complete(prompt)
            .await
            .map_err(|e| RagError::Generation(e.to_string()))
    }
}
