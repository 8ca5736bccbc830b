//! School AI-policy assistant.
//!
//! Answers questions about, and drafts, school AI-usage policies grounded in
//! an indexed corpus of existing policies, and scores every generated answer
//! in the background.

pub mod assistant;
pub mod core;
pub mod evaluation;
pub mod generation;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector_math;
