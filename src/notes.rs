//! Free-text journal entries: memories and state notes.
//!
//! Unlike document chunks, these ids are time-salted, so saving the same
//! text twice appends two entries. The surrounding application writes
//! memories (chat summaries, observations); the engine itself writes state
//! notes auditing ingest runs and dupe scans.

use chrono::Utc;

use crate::config::Config;
use crate::dupes::DuplicateReport;
use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::identity;
use crate::store::{Record, VectorStore};

/// Append a memory entry to the `memories` collection.
pub fn save_memory(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    text: &str,
    tag: &str,
    source: &str,
) -> Result<String> {
    let vectors = embedder.embed(&[text.to_string()])?;
    let vector = vectors.into_iter().next().unwrap_or_default();
    let id = identity::entry_id(text, None, Utc::now());

    store.get_or_create(&cfg.collections.memories)?;
    store.upsert(
        &cfg.collections.memories,
        vec![Record {
            id: id.clone(),
            document: text.to_string(),
            metadata: serde_json::json!({ "tag": tag, "source": source }),
            vector,
        }],
    )?;
    Ok(id)
}

/// Record the audit note for a completed dupe scan. The scanner itself
/// stays embedder-free, so this lives with the other journal writers.
pub fn record_dupe_scan(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    report: &DuplicateReport,
) -> Result<String> {
    let text = format!(
        "Dupe scan at {}: {} filename group(s), {} exact group(s)",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        report.filename_groups.len(),
        report.exact_groups.len()
    );
    save_state_note(cfg, store, embedder, &text, "dupe-scan")
}

/// Append a state note to the `state_notes` collection.
pub fn save_state_note(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    text: &str,
    subtype: &str,
) -> Result<String> {
    let vectors = embedder.embed(&[text.to_string()])?;
    let vector = vectors.into_iter().next().unwrap_or_default();
    let id = identity::entry_id(text, Some(subtype), Utc::now());

    store.get_or_create(&cfg.collections.state_notes)?;
    store.upsert(
        &cfg.collections.state_notes,
        vec![Record {
            id: id.clone(),
            document: text.to_string(),
            metadata: serde_json::json!({ "tag": "state", "subtype": subtype }),
            vector,
        }],
    )?;
    Ok(id)
}
