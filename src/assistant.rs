use std::sync::Arc;

use crate::core::errors::RagError;
use crate::evaluation::{EvaluationJob, EvaluationQueue};
use crate::generation::{AnswerGenerator, PolicyDraft, PolicyRequest, QaAnswer};
use crate::rag::{ConversationTurn, QueryRewriter, RetrievalResult, Retriever};

/// Request-path orchestration: rewrite, retrieve, generate, then hand the
/// result to the evaluation queue without waiting for it.
#[derive(Clone)]
pub struct PolicyAssistant {
    retriever: Retriever,
    rewriter: QueryRewriter,
    generator: AnswerGenerator,
    evaluation: Option<Arc<EvaluationQueue>>,
}

impl PolicyAssistant {
    pub fn new(
        retriever: Retriever,
        rewriter: QueryRewriter,
        generator: AnswerGenerator,
        evaluation: Option<Arc<EvaluationQueue>>,
    ) -> Self {
        Self {
            retriever,
            rewriter,
            generator,
            evaluation,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> Result<QaAnswer, RagError> {
        let expanded = self.rewriter.rewrite(question, history);
        let passages = self.retriever.retrieve_default(&expanded).await?;
        let qa = self.generator.answer(&expanded, passages).await?;

        // Metrics are keyed on the question as the user asked it.
        self.enqueue(EvaluationJob::Answer {
            query: question.to_string(),
            answer: qa.answer.clone(),
            contexts: passage_texts(&qa.passages),
        });
        Ok(qa)
    }

    pub async fn generate_policy(&self, request: &PolicyRequest) -> Result<PolicyDraft, RagError> {
        let passages = self.retriever.retrieve_default(&request.retrieval_query()).await?;
        let draft = self.generator.draft_policy(request, &passages).await?;

        self.enqueue(EvaluationJob::Policy {
            generated_policy: draft.generated_policy.clone(),
            contexts: passage_texts(&passages),
            target_country: request.country.clone(),
        });
        Ok(draft)
    }

    fn enqueue(&self, job: EvaluationJob) {
        if let Some(queue) = &self.evaluation {
            queue.submit(job);
        }
    }
}

fn passage_texts(passages: &RetrievalResult) -> Vec<String> {
    passages.iter().map(|p| p.passage.text.clone()).collect()
}
