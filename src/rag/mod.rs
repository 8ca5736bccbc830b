//! Retrieval core.
//!
//! - `chunker`: overlapping chunking with a provenance header per chunk
//! - `store`: builds the [`Index`] from a corpus, snapshots it and reloads it
//! - `retriever`: top-k cosine search over the loaded index
//! - `rewriter`: folds conversation history into the retrieval query

pub mod chunker;
mod index;
mod passage;
pub mod rewriter;
mod retriever;
pub mod snapshot;
mod store;

pub use chunker::Chunker;
pub use index::Index;
pub use passage::{Passage, PassageMetadata, RetrievalResult, ScoredPassage};
pub use retriever::Retriever;
pub use rewriter::{ConversationTurn, QueryRewriter, Role};
pub use store::{should_rebuild, IndexStore};
