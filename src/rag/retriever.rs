use std::sync::Arc;

use super::index::Index;
use super::passage::RetrievalResult;
use crate::core::errors::RagError;
use crate::llm::LlmService;

/// Top-k similarity search over a loaded [`Index`].
///
/// Queries are embedded with the same model the index was built with.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<Index>,
    llm: LlmService,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<Index>, llm: LlmService, top_k: usize) -> Self {
        Self { index, llm, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    /// Retrieves with the deployment's configured `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<RetrievalResult, RagError> {
        self.retrieve(query, self.top_k).await
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .llm
            .embed_one(query)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        if embedding.len() != self.index.dimension() {
            return Err(RagError::Embedding(format!(
                "query embedding has dimension {}, index has {}",
                embedding.len(),
                self.index.dimension()
            )));
        }

        let results = self.index.search(&embedding, k);
        tracing::debug!("Retrieved {} passages (k={})", results.len(), k);
        Ok(results)
    }
}
