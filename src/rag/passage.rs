use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ingest::DocumentMetadata;

/// Provenance of a single chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub school: String,
    pub country: String,
    pub level: String,
    pub source: String,
    pub chunk_index: usize,
}

impl PassageMetadata {
    pub fn from_document(document: &DocumentMetadata, chunk_index: usize) -> Self {
        Self {
            school: document.school.clone(),
            country: document.country.clone(),
            level: document.level.clone(),
            source: document.source.clone(),
            chunk_index,
        }
    }
}

/// An embedded chunk. The text already carries its provenance header.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: PassageMetadata,
}

#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Arc<Passage>,
    pub score: f32,
}

/// Passages ordered by descending similarity.
pub type RetrievalResult = Vec<ScoredPassage>;
