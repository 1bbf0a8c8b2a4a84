//! Ingestion pipeline: walk → filter → chunk → embed → upsert.
//!
//! One pass produces one batched embedding call for every chunk in the
//! batch, then a single upsert into the `docs` collection. Chunk ids are
//! content-addressed (`file_hash:ordinal`), so re-ingesting unchanged files
//! replaces records with themselves and the collection count stays put.
//!
//! Ingestion never mutates or deletes files. A file that cannot be read is
//! logged, counted as skipped, and the batch carries on.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::chunk::{chunk_text, normalize};
use crate::config::Config;
use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::identity;
use crate::notes;
use crate::store::{Record, VectorStore};
use crate::walker;

/// Counts reported by a single ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Eligible files considered.
    pub files_scanned: usize,
    /// Files skipped because they could not be read.
    pub files_skipped: usize,
    /// Files skipped because they were empty after normalization.
    pub files_empty: usize,
    /// Chunks embedded and upserted.
    pub chunks_embedded: usize,
}

impl IngestReport {
    /// True when nothing was found to ingest — a no-op, not an error.
    pub fn is_empty(&self) -> bool {
        self.files_scanned == 0
    }
}

/// Ingest a file or folder into the `docs` collection.
///
/// A single-file `path` is ingested as-is (the caller chose it
/// deliberately); a directory is walked through the shared eligibility
/// filter. Records an `"Ingested path .. at .."` state note when anything
/// was embedded.
pub fn ingest(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    path: &Path,
) -> Result<IngestReport> {
    let files: Vec<walker::FileEntry> = if path.is_file() {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        vec![walker::FileEntry {
            path: path.to_path_buf(),
            modified,
        }]
    } else {
        walker::eligible_files(cfg, path)?
    };

    let mut report = IngestReport {
        files_scanned: files.len(),
        ..IngestReport::default()
    };

    if files.is_empty() {
        info!(root = %path.display(), "no files matched for ingestion");
        return Ok(report);
    }

    let mut ids = Vec::new();
    let mut texts = Vec::new();
    let mut metadatas = Vec::new();

    for entry in &files {
        // file identity is the hash of the raw bytes, before any decoding,
        // matching what the duplicate scanner hashes
        let bytes = match std::fs::read(&entry.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %entry.path.display(), error = %e, "skipping unreadable file");
                report.files_skipped += 1;
                continue;
            }
        };
        let file_hash = identity::hash_bytes(&bytes);
        let raw = walker::decode_lenient(bytes);
        if normalize(&raw).is_empty() {
            report.files_empty += 1;
            continue;
        }
        let chunks = chunk_text(&raw, cfg.chunk_chars, cfg.chunk_overlap)?;
        let mtime = mtime_secs(entry.modified);

        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            ids.push(identity::chunk_id(&file_hash, ordinal));
            metadatas.push(serde_json::json!({
                "path": entry.path.to_string_lossy(),
                "file_hash": file_hash,
                "chunk_index": ordinal,
                "tag": "doc",
                "mtime": mtime,
            }));
            texts.push(chunk);
        }
    }

    if texts.is_empty() {
        info!(root = %path.display(), "nothing to add after filtering");
        return Ok(report);
    }

    info!(chunks = texts.len(), "embedding chunk batch");
    let vectors = embedder.embed(&texts)?;

    let records: Vec<Record> = ids
        .into_iter()
        .zip(texts)
        .zip(metadatas)
        .zip(vectors)
        .map(|(((id, document), metadata), vector)| Record {
            id,
            document,
            metadata,
            vector,
        })
        .collect();

    report.chunks_embedded = records.len();
    store.get_or_create(&cfg.collections.docs)?;
    store.upsert(&cfg.collections.docs, records)?;

    info!(
        chunks = report.chunks_embedded,
        files = report.files_scanned,
        skipped = report.files_skipped,
        "ingest pass complete"
    );

    let now: DateTime<Utc> = Utc::now();
    notes::save_state_note(
        cfg,
        store,
        embedder,
        &format!(
            "Ingested path {} at {}",
            path.display(),
            now.format("%Y-%m-%dT%H:%M:%SZ")
        ),
        "ingest",
    )?;

    Ok(report)
}

fn mtime_secs(t: std::time::SystemTime) -> u64 {
    t.duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
