//! Debounced file-system watcher that re-ingests changed files.
//!
//! Optional (`file-watcher` feature). Create and modify events for
//! eligible files are debounced and forwarded over a channel; dropping the
//! [`FolderWatcher`] stops the watch. [`watch_loop`] is the convenience
//! consumer that re-ingests each changed path, logging backend failures
//! and carrying on rather than tearing the loop down.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use notify_debouncer_full::{
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
    new_debouncer, DebounceEventResult, Debouncer, RecommendedCache,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::TextEmbedder;
use crate::error::{EngineError, Result};
use crate::ingest;
use crate::store::VectorStore;
use crate::walker;

const DEBOUNCE_MS: u64 = 1500;

/// A change to an eligible file.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) => p,
        }
    }
}

/// Watches configured folders for changes to eligible files.
pub struct FolderWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl FolderWatcher {
    /// Start watching `dirs` recursively. Events for ineligible paths are
    /// filtered out before they reach the channel.
    pub fn start(cfg: &Config, dirs: &[PathBuf]) -> Result<(Self, Receiver<WatchEvent>)> {
        let (tx, rx) = mpsc::channel();
        let ignore = walker::build_ignore_set(cfg)?;
        let filter_cfg = cfg.clone();

        let mut debouncer = new_debouncer(
            std::time::Duration::from_millis(DEBOUNCE_MS),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        for path in &event.paths {
                            if !walker::is_eligible(&filter_cfg, &ignore, path) {
                                continue;
                            }
                            let watch_event = match event.kind {
                                EventKind::Create(_) => WatchEvent::Created(path.clone()),
                                EventKind::Modify(_) => WatchEvent::Modified(path.clone()),
                                _ => continue,
                            };
                            debug!(path = %path.display(), "watched file changed");
                            if tx.send(watch_event).is_err() {
                                return; // receiver dropped
                            }
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "file watcher error");
                    }
                }
            },
        )
        .map_err(|e| {
            EngineError::BackendUnavailable(format!("failed to start file watcher: {e}"))
        })?;

        for dir in dirs {
            if !dir.exists() {
                warn!(dir = %dir.display(), "watch folder does not exist; skipping");
                continue;
            }
            debouncer
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|e| {
                    EngineError::BackendUnavailable(format!(
                        "failed to watch {}: {e}",
                        dir.display()
                    ))
                })?;
            info!(dir = %dir.display(), "watching folder");
        }

        Ok((Self { debouncer }, rx))
    }

    /// Stop watching. Equivalent to dropping the watcher.
    pub fn stop(self) {
        drop(self.debouncer);
    }
}

/// Consume watch events, re-ingesting each changed path. An embedding
/// backend failure is logged and the loop continues; the loop ends when
/// the watcher (and with it the sending side) is dropped.
pub fn watch_loop(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    rx: Receiver<WatchEvent>,
) {
    for event in rx {
        let path = event.path();
        info!(path = %path.display(), "re-ingesting changed file");
        match ingest::ingest(cfg, store, embedder, path) {
            Ok(report) => {
                debug!(chunks = report.chunks_embedded, "re-ingest complete");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "re-ingest failed; watch continues");
            }
        }
    }
}
