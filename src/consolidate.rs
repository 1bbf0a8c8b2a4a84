//! Consolidation of duplicate files.
//!
//! [`plan`] is a pure function from filename-duplicate groups (whose
//! members carry scan-time mtimes) and a keep-strategy to a reviewable
//! list of actions. Nothing touches the file system until [`apply`], which
//! asks a caller-supplied confirmation predicate before every deletion.
//! Plan-only mode is simply never calling `apply`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::dupes::DupEntry;
use crate::error::{EngineError, Result};

/// Which member of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepStrategy {
    /// Keep the member with the greatest modification time.
    Newest,
    /// Keep the member with the smallest modification time.
    Oldest,
    /// Keep the first member in enumeration order, ignoring metadata.
    KeepFirst,
}

impl FromStr for KeepStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "newest" => Ok(KeepStrategy::Newest),
            "oldest" => Ok(KeepStrategy::Oldest),
            "keep_first" => Ok(KeepStrategy::KeepFirst),
            other => Err(EngineError::Configuration(format!(
                "unknown keep strategy '{other}'; use newest, oldest, or keep_first"
            ))),
        }
    }
}

/// One group's resolution: the path to keep and the paths to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationAction {
    pub group: String,
    pub keep: PathBuf,
    pub remove: Vec<PathBuf>,
}

/// Outcome counts from [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub deleted: usize,
    pub declined: usize,
    pub failed: usize,
}

/// Compute a consolidation plan. Pure: group members carry their mtimes,
/// so no file-system access happens here.
///
/// Modification-time ties fall back to enumeration order (the group's
/// member order), which is deterministic for a scanned tree but should not
/// be assumed stable across platforms.
pub fn plan(
    groups: &BTreeMap<String, Vec<DupEntry>>,
    strategy: KeepStrategy,
) -> Vec<ConsolidationAction> {
    let mut actions = Vec::new();
    for (name, entries) in groups {
        if entries.len() < 2 {
            continue;
        }
        let keep = match strategy {
            KeepStrategy::Newest => {
                let Some(best) = entries.iter().map(|e| e.modified).max() else {
                    continue;
                };
                entries
                    .iter()
                    .find(|e| e.modified == best)
                    .map(|e| e.path.clone())
            }
            KeepStrategy::Oldest => {
                let Some(best) = entries.iter().map(|e| e.modified).min() else {
                    continue;
                };
                entries
                    .iter()
                    .find(|e| e.modified == best)
                    .map(|e| e.path.clone())
            }
            KeepStrategy::KeepFirst => entries.first().map(|e| e.path.clone()),
        };
        let Some(keep) = keep else { continue };
        let remove = entries
            .iter()
            .filter(|e| e.path != keep)
            .map(|e| e.path.clone())
            .collect();
        actions.push(ConsolidationAction {
            group: name.clone(),
            keep,
            remove,
        });
    }
    actions
}

/// Execute a plan, calling `confirm` before each deletion. A declined
/// confirmation leaves the file alone; a failed deletion is logged and the
/// remaining deletions proceed.
pub fn apply(
    actions: &[ConsolidationAction],
    mut confirm: impl FnMut(&Path) -> bool,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    for action in actions {
        info!(group = %action.group, keep = %action.keep.display(), "consolidating group");
        for path in &action.remove {
            if !confirm(path) {
                report.declined += 1;
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => {
                    info!(file = %path.display(), "deleted duplicate");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to delete duplicate");
                    report.failed += 1;
                }
            }
        }
    }
    report
}
