//! On-disk snapshot of an [`Index`].
//!
//! A snapshot is a directory holding `manifest.json`, `passages.json` (text
//! and metadata in insertion order) and `vectors.bin` (little-endian `f32`,
//! `count * dimension` values). It is written to a sibling temporary
//! directory and renamed into place, so readers never observe a partial
//! snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::index::Index;
use super::passage::{Passage, PassageMetadata};
use crate::core::errors::RagError;

pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const PASSAGES_FILE: &str = "passages.json";
const VECTORS_FILE: &str = "vectors.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    pub dimension: usize,
    pub count: usize,
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
    pub vectors_sha256: String,
}

#[derive(Serialize)]
struct PassageRecordRef<'a> {
    text: &'a str,
    metadata: &'a PassageMetadata,
}

#[derive(Deserialize)]
struct PassageRecord {
    text: String,
    metadata: PassageMetadata,
}

/// A snapshot exists once its manifest has been renamed into place.
pub fn exists(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file()
}

pub fn save(dir: &Path, index: &Index, embedding_model: &str) -> Result<SnapshotManifest, RagError> {
    let vectors = serialize_embeddings(index);
    let manifest = SnapshotManifest {
        format_version: FORMAT_VERSION,
        dimension: index.dimension(),
        count: index.len(),
        embedding_model: embedding_model.to_string(),
        created_at: Utc::now(),
        vectors_sha256: hex::encode(Sha256::digest(&vectors)),
    };

    let staging = staging_dir(dir);
    if let Some(parent) = staging.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(err) = write_files(&staging, index, &vectors, &manifest) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::rename(&staging, dir)?;

    tracing::info!(
        "Saved index snapshot to {} ({} passages, dimension {}, {} vector bytes)",
        dir.display(),
        manifest.count,
        manifest.dimension,
        vectors.len()
    );
    Ok(manifest)
}

pub fn load(dir: &Path) -> Result<(Index, SnapshotManifest), RagError> {
    let manifest: SnapshotManifest = read_json(&dir.join(MANIFEST_FILE))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::CorruptIndex(format!(
            "unsupported format version {}",
            manifest.format_version
        )));
    }
    if manifest.count > 0 && manifest.dimension == 0 {
        return Err(RagError::corrupt("non-empty index with zero dimension"));
    }

    let records: Vec<PassageRecord> = read_json(&dir.join(PASSAGES_FILE))?;
    if records.len() != manifest.count {
        return Err(RagError::CorruptIndex(format!(
            "manifest lists {} passages but {} were stored",
            manifest.count,
            records.len()
        )));
    }

    let vectors_path = dir.join(VECTORS_FILE);
    let bytes = fs::read(&vectors_path)
        .map_err(|e| RagError::CorruptIndex(format!("{}: {}", vectors_path.display(), e)))?;
    let row_bytes = manifest
        .dimension
        .checked_mul(4)
        .ok_or_else(|| RagError::corrupt(format!("dimension {} is out of range", manifest.dimension)))?;
    let expected = manifest.count.checked_mul(row_bytes).ok_or_else(|| {
        RagError::corrupt(format!(
            "{} passages of dimension {} is out of range",
            manifest.count, manifest.dimension
        ))
    })?;
    if bytes.len() != expected {
        return Err(RagError::CorruptIndex(format!(
            "vectors.bin holds {} bytes, expected {}",
            bytes.len(),
            expected
        )));
    }
    if hex::encode(Sha256::digest(&bytes)) != manifest.vectors_sha256 {
        return Err(RagError::corrupt("vectors.bin checksum mismatch"));
    }

    let embeddings = deserialize_embeddings(&bytes, row_bytes);
    let passages = records
        .into_iter()
        .zip(embeddings)
        .map(|(record, embedding)| Passage {
            text: record.text,
            embedding,
            metadata: record.metadata,
        })
        .collect();

    let index = Index::new(passages)?;
    tracing::info!(
        "Loaded index snapshot from {} ({} passages)",
        dir.display(),
        index.len()
    );
    Ok((index, manifest))
}

fn write_files(
    staging: &Path,
    index: &Index,
    vectors: &[u8],
    manifest: &SnapshotManifest,
) -> Result<(), RagError> {
    fs::create_dir_all(staging)?;

    let records: Vec<PassageRecordRef<'_>> = index
        .passages()
        .iter()
        .map(|p| PassageRecordRef {
            text: &p.text,
            metadata: &p.metadata,
        })
        .collect();
    let passages_json = serde_json::to_vec(&records).map_err(RagError::corrupt)?;
    fs::write(staging.join(PASSAGES_FILE), passages_json)?;
    fs::write(staging.join(VECTORS_FILE), vectors)?;

    // Manifest last: its presence marks the snapshot complete.
    let manifest_json = serde_json::to_vec_pretty(manifest).map_err(RagError::corrupt)?;
    fs::write(staging.join(MANIFEST_FILE), manifest_json)?;
    Ok(())
}

fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index".to_string());
    dir.with_file_name(format!(".{}.tmp-{}", name, uuid::Uuid::new_v4()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RagError> {
    let raw = fs::read(path)
        .map_err(|e| RagError::CorruptIndex(format!("{}: {}", path.display(), e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| RagError::CorruptIndex(format!("{}: {}", path.display(), e)))
}

fn serialize_embeddings(index: &Index) -> Vec<u8> {
    index
        .passages()
        .iter()
        .flat_map(|p| p.embedding.iter().flat_map(|f| f.to_le_bytes()))
        .collect()
}

fn deserialize_embeddings(bytes: &[u8], row_bytes: usize) -> Vec<Vec<f32>> {
    if row_bytes == 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(row_bytes)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Index {
        let passages = ["France primary policy", "Japan secondary policy"]
            .iter()
            .enumerate()
            .map(|(i, text)| Passage {
                text: text.to_string(),
                embedding: vec![i as f32, 0.5, -1.25],
                metadata: PassageMetadata {
                    school: format!("School {}", i),
                    country: "France".to_string(),
                    level: "primary".to_string(),
                    source: "policy.pdf".to_string(),
                    chunk_index: i,
                },
            })
            .collect();
        Index::new(passages).expect("index")
    }

    #[test]
    fn save_then_load_restores_passages_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        let index = sample_index();

        assert!(!exists(&target));
        let manifest = save(&target, &index, "embed-model").expect("save");
        assert!(exists(&target));
        assert_eq!(manifest.count, 2);
        assert_eq!(manifest.dimension, 3);

        let (loaded, loaded_manifest) = load(&target).expect("load");
        assert_eq!(loaded_manifest, manifest);
        assert_eq!(loaded.len(), 2);
        for (left, right) in loaded.passages().iter().zip(index.passages()) {
            assert_eq!(left.as_ref(), right.as_ref());
        }
    }

    #[test]
    fn save_replaces_existing_snapshot_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        save(&target, &sample_index(), "m").expect("first save");
        save(&target, &Index::empty(), "m").expect("second save");

        let (loaded, _) = load(&target).expect("load");
        assert!(loaded.is_empty());
        let entries: Vec<_> = fs::read_dir(dir.path()).expect("read_dir").collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn truncated_vectors_are_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        save(&target, &sample_index(), "m").expect("save");

        let vectors = target.join(VECTORS_FILE);
        let bytes = fs::read(&vectors).expect("read");
        fs::write(&vectors, &bytes[..bytes.len() - 4]).expect("truncate");

        assert!(matches!(load(&target), Err(RagError::CorruptIndex(_))));
    }

    #[test]
    fn oversized_dimension_is_corrupt_not_a_panic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        save(&target, &sample_index(), "m").expect("save");
        fs::write(target.join(VECTORS_FILE), b"").expect("empty vectors");

        // The first overflows the row size, the second the total size.
        for dimension in [usize::MAX / 4 + 1, usize::MAX / 8 + 1] {
            let manifest = SnapshotManifest {
                format_version: FORMAT_VERSION,
                dimension,
                count: 2,
                embedding_model: "m".to_string(),
                created_at: Utc::now(),
                vectors_sha256: hex::encode(Sha256::digest(b"")),
            };
            fs::write(
                target.join(MANIFEST_FILE),
                serde_json::to_vec(&manifest).expect("manifest json"),
            )
            .expect("manifest");

            let err = load(&target).expect_err("overflowing manifest");
            assert!(matches!(err, RagError::CorruptIndex(ref msg) if msg.contains("out of range")));
        }
    }

    #[test]
    fn tampered_vectors_fail_checksum() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        save(&target, &sample_index(), "m").expect("save");

        let vectors = target.join(VECTORS_FILE);
        let mut bytes = fs::read(&vectors).expect("read");
        bytes[0] ^= 0xFF;
        fs::write(&vectors, bytes).expect("write");

        let err = load(&target).expect_err("checksum");
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn unreadable_manifest_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("index");
        fs::create_dir_all(&target).expect("mkdir");
        fs::write(target.join(MANIFEST_FILE), "not json").expect("write");

        assert!(matches!(load(&target), Err(RagError::CorruptIndex(_))));
        assert!(matches!(load(&dir.path().join("missing")), Err(RagError::CorruptIndex(_))));
    }
}
