use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{clean_text, strip_html_tags, CorpusSource, DocumentMetadata, SourceDocument};
use crate::core::config::CorpusSettings;
use crate::core::errors::RagError;

/// An entry of the web-page manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPageEntry {
    pub url: String,
    pub school: String,
    pub country: String,
    pub level: String,
}

/// Corpus read from a `<level>/<country>/<school>.<ext>` directory tree plus a
/// JSON manifest of web pages.
pub struct FilesystemCorpus {
    base_folder: PathBuf,
    web_manifest: PathBuf,
    web_timeout: Duration,
}

impl FilesystemCorpus {
    pub fn new(base_folder: PathBuf, web_manifest: PathBuf) -> Self {
        Self {
            base_folder,
            web_manifest,
            web_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &CorpusSettings, resolve: impl Fn(&Path) -> PathBuf) -> Self {
        Self {
            base_folder: resolve(&settings.base_folder),
            web_manifest: resolve(&settings.web_manifest),
            web_timeout: Duration::from_secs(settings.web_timeout_secs),
        }
    }

    /// Lists `(path, metadata)` for every supported file under the base folder,
    /// sorted so builds are reproducible.
    pub fn discover_files(&self) -> Result<Vec<(PathBuf, DocumentMetadata)>, RagError> {
        let mut found = Vec::new();
        if !self.base_folder.is_dir() {
            tracing::warn!(
                "Policy folder {} does not exist; no local documents",
                self.base_folder.display()
            );
            return Ok(found);
        }

        for level_dir in sorted_entries(&self.base_folder)? {
            if !level_dir.is_dir() {
                continue;
            }
            let level = file_name(&level_dir);

            for country_dir in sorted_entries(&level_dir)? {
                if !country_dir.is_dir() {
                    continue;
                }
                let country = file_name(&country_dir);

                for file in sorted_entries(&country_dir)? {
                    if !file.is_file() || DocumentKind::from_path(&file).is_none() {
                        continue;
                    }
                    let school = file
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let metadata = DocumentMetadata {
                        school,
                        country: country.clone(),
                        level: level.clone(),
                        source: file.to_string_lossy().to_string(),
                    };
                    found.push((file, metadata));
                }
            }
        }

        Ok(found)
    }

    fn read_manifest(&self) -> Result<Vec<WebPageEntry>, RagError> {
        if !self.web_manifest.exists() {
            tracing::info!(
                "No web manifest at {}; skipping web pages",
                self.web_manifest.display()
            );
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.web_manifest)?;
        serde_json::from_str(&raw).map_err(|e| {
            RagError::ingestion(self.web_manifest.to_string_lossy(), e)
        })
    }

    async fn extract_web_page(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<String, RagError> {
        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RagError::ingestion(url, e))?;
        let html = response.text().await.map_err(|e| RagError::ingestion(url, e))?;
        Ok(clean_text(&strip_html_tags(&html)))
    }
}

#[async_trait]
impl CorpusSource for FilesystemCorpus {
    async fn load_documents(&self) -> Result<Vec<SourceDocument>, RagError> {
        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (path, metadata) in self.discover_files()? {
            match extract_file(path).await {
                Ok(text) if !text.is_empty() => documents.push(SourceDocument { text, metadata }),
                Ok(_) => {
                    skipped += 1;
                    tracing::warn!("Skipping {}: no extractable text", metadata.source);
                }
                Err(err) => {
                    skipped += 1;
                    tracing::warn!("Skipping document: {}", err);
                }
            }
        }

        let pages = self.read_manifest().unwrap_or_else(|err| {
            tracing::warn!("Skipping web pages: {}", err);
            Vec::new()
        });
        if !pages.is_empty() {
            let client = reqwest::Client::builder()
                .timeout(self.web_timeout)
                .build()
                .map_err(|e| RagError::ingestion(self.web_manifest.to_string_lossy(), e))?;

            for page in pages {
                match self.extract_web_page(&client, &page.url).await {
                    Ok(text) if !text.is_empty() => documents.push(SourceDocument {
                        text,
                        metadata: DocumentMetadata {
                            school: page.school,
                            country: page.country,
                            level: page.level,
                            source: page.url,
                        },
                    }),
                    Ok(_) => {
                        skipped += 1;
                        tracing::warn!("Skipping {}: page has no text", page.url);
                    }
                    Err(err) => {
                        skipped += 1;
                        tracing::warn!("Skipping document: {}", err);
                    }
                }
            }
        }

        tracing::info!(
            "Loaded {} policy documents ({} skipped)",
            documents.len(),
            skipped
        );
        Ok(documents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "md" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

async fn extract_file(path: PathBuf) -> Result<String, RagError> {
    let source = path.to_string_lossy().to_string();
    let kind = DocumentKind::from_path(&path)
        .ok_or_else(|| RagError::ingestion(&source, "unsupported file type"))?;

    let raw = match kind {
        DocumentKind::PlainText => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RagError::ingestion(&source, e))?,
        DocumentKind::Pdf => tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
            .await
            .map_err(|e| RagError::ingestion(&source, e))?
            .map_err(|e| RagError::ingestion(&source, e))?,
    };

    Ok(clean_text(&raw))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, RagError> {
    let mut entries = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[tokio::test]
    async fn walks_level_country_tree_and_skips_unsupported_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("policies");
        write(
            &base.join("primary").join("France").join("Ecole Jules Ferry.txt"),
            "Les élèves   peuvent utiliser l'IA.\nPage 3",
        );
        write(
            &base.join("secondary").join("Japan").join("Tokyo High.md"),
            "Generative AI requires teacher approval.",
        );
        write(&base.join("secondary").join("Japan").join("notes.docx"), "ignored");
        write(&base.join("secondary").join("Japan").join("empty.txt"), "   ");

        let corpus = FilesystemCorpus::new(base.clone(), dir.path().join("missing.json"));
        let documents = corpus.load_documents().await.expect("load");

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].metadata.level, "primary");
        assert_eq!(documents[0].metadata.country, "France");
        assert_eq!(documents[0].metadata.school, "Ecole Jules Ferry");
        assert_eq!(documents[0].text, "Les élèves peuvent utiliser l'IA.");
        assert_eq!(documents[1].metadata.school, "Tokyo High");
    }

    #[tokio::test]
    async fn unreadable_pdf_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("policies");
        write(&base.join("primary").join("Kenya").join("broken.pdf"), "not a pdf");
        write(
            &base.join("primary").join("Kenya").join("Nairobi Primary.txt"),
            "AI tools are allowed for research.",
        );

        let corpus = FilesystemCorpus::new(base, dir.path().join("web.json"));
        let documents = corpus.load_documents().await.expect("load");

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].metadata.school, "Nairobi Primary");
    }

    #[tokio::test]
    async fn missing_base_folder_yields_empty_corpus() {
        let dir = tempfile::tempdir().expect("tempdir");
        let corpus = FilesystemCorpus::new(dir.path().join("nope"), dir.path().join("web.json"));
        assert!(corpus.load_documents().await.expect("load").is_empty());
    }

    #[test]
    fn malformed_manifest_is_an_ingestion_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("web.json");
        write(&manifest, "{ not json");
        let corpus = FilesystemCorpus::new(dir.path().to_path_buf(), manifest);
        assert!(matches!(corpus.read_manifest(), Err(RagError::Ingestion { .. })));
    }
}
