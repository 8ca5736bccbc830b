use std::path::Path;
use std::sync::Arc;

use super::chunker::{provenance_header, Chunker};
use super::index::Index;
use super::passage::{Passage, PassageMetadata};
use super::snapshot;
use crate::core::config::IndexSettings;
use crate::core::errors::RagError;
use crate::ingest::{CorpusSource, SourceDocument};
use crate::llm::LlmService;

/// Inputs per embedding request.
const EMBED_BATCH_SIZE: usize = 64;

/// Builds, persists and reloads the passage index.
#[derive(Clone)]
pub struct IndexStore {
    llm: LlmService,
    chunker: Chunker,
}

impl IndexStore {
    pub fn new(llm: LlmService, chunker: Chunker) -> Self {
        Self { llm, chunker }
    }

    pub fn from_settings(llm: LlmService, settings: &IndexSettings) -> Self {
        Self::new(llm, Chunker::new(settings.chunk_size, settings.chunk_overlap))
    }

    /// Chunks and embeds the whole corpus, then replaces the snapshot at
    /// `path`. Any failure aborts the build; nothing is resumed.
    pub async fn build(&self, path: &Path, corpus: &[SourceDocument]) -> Result<Arc<Index>, RagError> {
        let mut pending: Vec<(String, PassageMetadata)> = Vec::new();
        for document in corpus {
            let header = provenance_header(&document.metadata);
            for (chunk_index, chunk) in self.chunker.chunk(&document.text).into_iter().enumerate() {
                pending.push((
                    format!("{}\n{}", header, chunk),
                    PassageMetadata::from_document(&document.metadata, chunk_index),
                ));
            }
        }
        tracing::info!(
            "Created {} chunks from {} documents",
            pending.len(),
            corpus.len()
        );

        let mut passages = Vec::with_capacity(pending.len());
        for batch in pending.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|(text, _)| text.clone()).collect();
            let embeddings = self
                .llm
                .embed(&texts)
                .await
                .map_err(|e| RagError::Embedding(e.to_string()))?;
            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            passages.extend(batch.iter().cloned().zip(embeddings).map(
                |((text, metadata), embedding)| Passage {
                    text,
                    embedding,
                    metadata,
                },
            ));
        }

        let index = Arc::new(Index::new(passages)?);
        let snapshot_index = Arc::clone(&index);
        let target = path.to_path_buf();
        let model = self.llm.embedding_model().to_string();
        tokio::task::spawn_blocking(move || snapshot::save(&target, &snapshot_index, &model))
            .await
            .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        Ok(index)
    }

    pub async fn load(&self, path: &Path) -> Result<Arc<Index>, RagError> {
        let target = path.to_path_buf();
        let (index, manifest) = tokio::task::spawn_blocking(move || snapshot::load(&target))
            .await
            .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        if manifest.embedding_model != self.llm.embedding_model() {
            tracing::warn!(
                "Index at {} was built with {}, queries use {}; consider FORCE_REBUILD",
                path.display(),
                manifest.embedding_model,
                self.llm.embedding_model()
            );
        }
        Ok(Arc::new(index))
    }

    /// Loads the snapshot at `path`, or builds one from `source` when `force`
    /// is set or no snapshot exists yet.
    pub async fn load_or_build(
        &self,
        path: &Path,
        source: &dyn CorpusSource,
        force: bool,
    ) -> Result<Arc<Index>, RagError> {
        if should_rebuild(path, force) {
            tracing::info!("Building new index at {} (force={})", path.display(), force);
            let corpus = source.load_documents().await?;
            self.build(path, &corpus).await
        } else {
            tracing::info!("Loading existing index from {}", path.display());
            self.load(path).await
        }
    }
}

pub fn should_rebuild(path: &Path, force: bool) -> bool {
    force || !snapshot::exists(path)
}
