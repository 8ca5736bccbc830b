//! Document ingestion.
//!
//! Turns the policy corpus (PDFs and plain-text files laid out as
//! `<level>/<country>/<school>.<ext>`, plus a manifest of web pages) into
//! normalized [`SourceDocument`]s. A document that cannot be read is logged
//! and skipped; it never aborts the whole corpus.

mod filesystem;
mod html;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

pub use filesystem::{FilesystemCorpus, WebPageEntry};
pub use html::strip_html_tags;

/// Provenance of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub school: String,
    pub country: String,
    pub level: String,
    /// File path or URL the text came from.
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Anything that can enumerate the documents an index is built from.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn load_documents(&self) -> Result<Vec<SourceDocument>, RagError>;
}

#[async_trait]
impl CorpusSource for Vec<SourceDocument> {
    async fn load_documents(&self) -> Result<Vec<SourceDocument>, RagError> {
        Ok(self.clone())
    }
}

/// Collapses whitespace runs and strips `Page <n>` markers left by PDF
/// extraction.
pub fn clean_text(text: &str) -> String {
    static PAGE_MARKER: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let page_marker = PAGE_MARKER.get_or_init(|| Regex::new(r"Page \d+").expect("valid regex"));

    let without_pages = page_marker.replace_all(text, "");
    let collapsed = whitespace.replace_all(&without_pages, " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_page_markers() {
        let raw = "  AI  use\n\nis permitted.\tPage 12 Teachers must\r\nreview. ";
        assert_eq!(clean_text(raw), "AI use is permitted. Teachers must review.");
    }

    #[test]
    fn clean_text_of_blank_input_is_empty() {
        assert_eq!(clean_text(" \n\t "), "");
    }
}
