//! Duplicate detection.
//!
//! Two cheap exact checks run on every scan — filename grouping and
//! content-hash grouping, both O(n) over the eligible file set. Semantic
//! near-duplicate comparison is O(n²) and deliberately not part of a scan:
//! a report only carries the configured similarity threshold, and
//! [`near_duplicate_pairs`] is the separate, explicitly invoked pass a
//! caller runs against a known subset of stored chunks.
//!
//! Reports are ephemeral: recomputed from the current file-system state on
//! every call, never persisted.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::identity;
use crate::store::VectorStore;
use crate::walker;

/// One member of a filename-duplicate group, with the modification time
/// captured at scan time so consolidation planning stays pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DupEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Advisory for the deferred near-duplicate pass.
#[derive(Debug, Clone)]
pub struct NearDupAdvisory {
    /// Cosine similarity at or above which two chunks count as near-dups.
    pub threshold: f32,
    pub note: String,
}

/// Result of one duplicate scan.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    /// Basename → members, groups of two or more, in enumeration order.
    pub filename_groups: BTreeMap<String, Vec<DupEntry>>,
    /// Content hash → paths, groups of two or more, in enumeration order.
    pub exact_groups: BTreeMap<String, Vec<PathBuf>>,
    pub near_dup: NearDupAdvisory,
}

impl DuplicateReport {
    /// True when neither exact nor filename duplicates were found.
    pub fn is_empty(&self) -> bool {
        self.filename_groups.is_empty() && self.exact_groups.is_empty()
    }

    /// Human-readable summary covering both the "no duplicates" and
    /// "found N" cases explicitly.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.filename_groups.is_empty() {
            out.push_str("No filename duplicates found.\n");
        } else {
            let _ = writeln!(
                out,
                "Found {} filename group(s) with duplicates:",
                self.filename_groups.len()
            );
            for (name, entries) in &self.filename_groups {
                let _ = writeln!(out, "  {name} ({})", entries.len());
                for entry in entries {
                    let _ = writeln!(out, "    {}", entry.path.display());
                }
            }
        }
        if self.exact_groups.is_empty() {
            out.push_str("No exact content duplicates found.\n");
        } else {
            let _ = writeln!(
                out,
                "Found {} exact content group(s):",
                self.exact_groups.len()
            );
            for (hash, paths) in &self.exact_groups {
                let _ = writeln!(out, "  {}… ({})", &hash[..12.min(hash.len())], paths.len());
                for path in paths {
                    let _ = writeln!(out, "    {}", path.display());
                }
            }
        }
        let _ = writeln!(
            out,
            "Near-duplicates: cosine >= {} — {}",
            self.near_dup.threshold, self.near_dup.note
        );
        out
    }
}

/// Scan `root` for duplicates among eligible files.
///
/// Uses the same eligibility filter as ingestion. A file that cannot be
/// hashed is dropped from content grouping only; the scan continues.
pub fn scan(cfg: &Config, root: &Path) -> Result<DuplicateReport> {
    let files = walker::eligible_files(cfg, root)?;

    let mut by_name: BTreeMap<String, Vec<DupEntry>> = BTreeMap::new();
    let mut by_hash: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for entry in &files {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        by_name.entry(name).or_default().push(DupEntry {
            path: entry.path.clone(),
            modified: entry.modified,
        });

        match std::fs::read(&entry.path) {
            Ok(bytes) => {
                let hash = identity::hash_bytes(&bytes);
                by_hash.entry(hash).or_default().push(entry.path.clone());
            }
            Err(e) => {
                warn!(file = %entry.path.display(), error = %e, "could not hash file; skipping from content grouping");
            }
        }
    }

    by_name.retain(|_, v| v.len() >= 2);
    by_hash.retain(|_, v| v.len() >= 2);

    Ok(DuplicateReport {
        filename_groups: by_name,
        exact_groups: by_hash,
        near_dup: NearDupAdvisory {
            threshold: cfg.min_near_dup_sim,
            note: "near-duplicate chunk comparison is on demand; run a \
                   similarity-directed consolidation pass over a known subset"
                .to_string(),
        },
    })
}

/// A near-duplicate chunk pair found by the explicit similarity pass.
#[derive(Debug, Clone)]
pub struct NearDupPair {
    pub id_a: String,
    pub id_b: String,
    pub similarity: f32,
}

/// The opt-in near-duplicate pass: compare the stored vectors of `ids`
/// against the rest of `collection` and report pairs at or above
/// `threshold`. Cost is proportional to `ids.len() × collection size`, so
/// callers direct it at a known subset rather than the whole corpus.
pub fn near_duplicate_pairs(
    store: &VectorStore,
    collection: &str,
    ids: &[String],
    threshold: f32,
) -> Result<Vec<NearDupPair>> {
    let probed: std::collections::BTreeSet<&str> = ids.iter().map(|s| s.as_str()).collect();
    let mut pairs = Vec::new();
    for id in ids {
        let Some(record) = store.get(collection, id)? else {
            continue;
        };
        for hit in store.query(collection, &record.vector, usize::MAX)? {
            if hit.id == *id {
                continue;
            }
            // when both ends are probed, the lexicographically smaller one
            // reports the pair; a partner outside the subset is reported
            // unconditionally
            if probed.contains(hit.id.as_str()) && hit.id < *id {
                continue;
            }
            let sim = hit.score;
            if sim >= threshold {
                pairs.push(NearDupPair {
                    id_a: id.clone(),
                    id_b: hit.id,
                    similarity: sim,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(pairs)
}
