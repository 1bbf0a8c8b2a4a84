//! Upgrade suggestions: cheap heuristics over store counts and the latest
//! duplicate report. Advisory only; nothing here mutates anything. An
//! empty list means nothing stood out.

use crate::config::Config;
use crate::dupes::DuplicateReport;
use crate::error::Result;
use crate::store::VectorStore;

/// Chunk count past which the flat store and a small embedding model start
/// to show their limits.
const LARGE_CORPUS_CHUNKS: usize = 5000;

/// Inspect the store and the duplicate report and return human-readable
/// suggestions.
pub fn suggest_upgrades(
    cfg: &Config,
    store: &VectorStore,
    report: &DuplicateReport,
) -> Result<Vec<String>> {
    let mut suggestions = Vec::new();

    let dupe_groups = report.filename_groups.len() + report.exact_groups.len();
    if dupe_groups >= cfg.suggest_threshold_dupes {
        suggestions.push(format!(
            "{dupe_groups} duplicate groups detected (threshold {}); run a \
             consolidation pass to reclaim space and reduce retrieval noise.",
            cfg.suggest_threshold_dupes
        ));
    }

    let docs = store.count(&cfg.collections.docs)?;
    if docs >= LARGE_CORPUS_CHUNKS {
        suggestions.push(format!(
            "docs collection holds {docs} chunks; consider a larger \
             chunk_chars (currently {}) or moving to a dedicated vector \
             database.",
            cfg.chunk_chars
        ));
        if cfg.embed_model.to_lowercase().contains("minilm") {
            suggestions.push(format!(
                "embedding model '{}' is a small general-purpose model; a \
                 corpus this size usually benefits from a stronger model.",
                cfg.embed_model
            ));
        }
    }

    let memories = store.count(&cfg.collections.memories)?;
    if docs > 0 && memories == 0 {
        suggestions.push(
            "no memories saved yet; session summaries make retrieval \
             noticeably more personal."
                .to_string(),
        );
    }

    if cfg.db_dir.exists() && !backup_dir(cfg).exists() {
        suggestions.push(format!(
            "no backup found next to {}; the store is rebuildable from \
             source files, but saved memories are not.",
            cfg.db_dir.display()
        ));
    }

    Ok(suggestions)
}

fn backup_dir(cfg: &Config) -> std::path::PathBuf {
    let name = cfg
        .db_dir
        .file_name()
        .map(|n| format!("{}_backup", n.to_string_lossy()))
        .unwrap_or_else(|| "memorybank_db_backup".to_string());
    cfg.db_dir
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dupes::{DupEntry, NearDupAdvisory};
    use crate::store::Record;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn empty_report(threshold: f32) -> DuplicateReport {
        DuplicateReport {
            filename_groups: BTreeMap::new(),
            exact_groups: BTreeMap::new(),
            near_dup: NearDupAdvisory {
                threshold,
                note: String::new(),
            },
        }
    }

    fn store_with_docs(dir: &TempDir, n: usize) -> VectorStore {
        let store = VectorStore::open(dir.path()).unwrap();
        let records: Vec<Record> = (0..n)
            .map(|i| Record {
                id: format!("h:{i}"),
                document: format!("chunk {i}"),
                metadata: serde_json::json!({ "tag": "doc" }),
                vector: vec![1.0, 0.0],
            })
            .collect();
        if n > 0 {
            store.upsert("docs", records).unwrap();
        }
        store
    }

    #[test]
    fn healthy_setup_suggests_nothing_about_dupes_or_size() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_docs(&tmp, 0);
        let cfg = Config {
            db_dir: tmp.path().join("absent_db"),
            ..Config::default()
        };
        let out = suggest_upgrades(&cfg, &store, &empty_report(0.985)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn dupe_groups_at_threshold_trigger_consolidation_hint() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_docs(&tmp, 0);
        let cfg = Config {
            db_dir: tmp.path().join("absent_db"),
            suggest_threshold_dupes: 2,
            ..Config::default()
        };

        let mut report = empty_report(0.985);
        report.exact_groups.insert(
            "hash1".to_string(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")],
        );
        report.filename_groups.insert(
            "x.md".to_string(),
            vec![
                DupEntry {
                    path: PathBuf::from("/a/x.md"),
                    modified: std::time::SystemTime::UNIX_EPOCH,
                },
                DupEntry {
                    path: PathBuf::from("/b/x.md"),
                    modified: std::time::SystemTime::UNIX_EPOCH,
                },
            ],
        );

        let out = suggest_upgrades(&cfg, &store, &report).unwrap();
        assert!(out.iter().any(|s| s.contains("consolidation")));
    }

    #[test]
    fn large_corpus_with_small_model_gets_both_hints() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_docs(&tmp, LARGE_CORPUS_CHUNKS);
        let cfg = Config {
            db_dir: tmp.path().join("absent_db"),
            ..Config::default()
        };
        let out = suggest_upgrades(&cfg, &store, &empty_report(0.985)).unwrap();
        assert!(out.iter().any(|s| s.contains("chunk_chars")));
        assert!(out.iter().any(|s| s.contains("stronger model")));
    }

    #[test]
    fn docs_without_memories_suggests_saving_some() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_docs(&tmp, 3);
        let cfg = Config {
            db_dir: tmp.path().join("absent_db"),
            ..Config::default()
        };
        let out = suggest_upgrades(&cfg, &store, &empty_report(0.985)).unwrap();
        assert!(out.iter().any(|s| s.contains("memories")));
    }

    #[test]
    fn existing_db_without_backup_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("db");
        std::fs::create_dir_all(&db).unwrap();
        let store = store_with_docs(&tmp, 0);
        let cfg = Config {
            db_dir: db.clone(),
            ..Config::default()
        };
        let out = suggest_upgrades(&cfg, &store, &empty_report(0.985)).unwrap();
        assert!(out.iter().any(|s| s.contains("backup")));

        std::fs::create_dir_all(tmp.path().join("db_backup")).unwrap();
        let out = suggest_upgrades(&cfg, &store, &empty_report(0.985)).unwrap();
        assert!(!out.iter().any(|s| s.contains("backup")));
    }
}
