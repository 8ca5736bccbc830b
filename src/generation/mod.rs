//! Grounded answer and policy generation.

mod generator;
pub mod prompt;

pub use generator::{AnswerGenerator, PolicyDraft, PolicyMetadata, PolicyRequest, QaAnswer};
