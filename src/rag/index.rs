use std::sync::Arc;

use super::passage::{Passage, RetrievalResult, ScoredPassage};
use crate::core::errors::RagError;
use crate::vector_math::rank_descending_by_cosine;

/// Ordered, immutable set of embedded passages.
///
/// Every embedding has the same dimension; rebuilding replaces the whole
/// index rather than mutating it.
#[derive(Debug, Default)]
pub struct Index {
    passages: Vec<Arc<Passage>>,
    dimension: usize,
}

impl Index {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(passages: Vec<Passage>) -> Result<Self, RagError> {
        let dimension = passages.first().map(|p| p.embedding.len()).unwrap_or(0);
        if dimension == 0 && !passages.is_empty() {
            return Err(RagError::corrupt("passages have empty embeddings"));
        }

        for (position, passage) in passages.iter().enumerate() {
            if passage.embedding.len() != dimension {
                return Err(RagError::CorruptIndex(format!(
                    "passage {} has dimension {}, expected {}",
                    position,
                    passage.embedding.len(),
                    dimension
                )));
            }
        }

        Ok(Self {
            passages: passages.into_iter().map(Arc::new).collect(),
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Embedding dimension, zero for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn passages(&self) -> &[Arc<Passage>] {
        &self.passages
    }

    /// Exhaustive cosine search. Ties keep insertion order.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> RetrievalResult {
        if k == 0 || self.passages.is_empty() {
            return Vec::new();
        }

        let mut ranked = rank_descending_by_cosine(
            query_embedding,
            self.passages.iter().map(|p| p.embedding.as_slice()),
        );
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(position, score)| ScoredPassage {
                passage: Arc::clone(&self.passages[position]),
                score,
            })
            .collect()
    }
}
