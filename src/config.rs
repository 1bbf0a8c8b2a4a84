//! TOML configuration for the engine.
//!
//! Every field has a default, so an empty file (or [`Config::default`])
//! yields a working local setup. [`load_config`] validates the values that
//! can silently corrupt a corpus — chunk geometry, thresholds, collection
//! names — and fails fast instead of limping along.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Engine configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Root folder that ingestion and the dupe scanner walk.
    pub data_dir: PathBuf,
    /// Directory owned by the vector store (its private on-disk format).
    pub db_dir: PathBuf,
    /// Embedding model identifier. A bare name selects the local backend;
    /// an `ollama:` prefix selects the external HTTP service.
    pub embed_model: String,
    /// Base URL for the external embedding service.
    pub embed_url: String,
    /// Results fetched per collection on retrieval.
    pub top_k: usize,
    /// Chunk window size, in characters of normalized text.
    pub chunk_chars: usize,
    /// Overlap carried between consecutive chunks. Must be `< chunk_chars`.
    pub chunk_overlap: usize,
    /// Logical collection names.
    pub collections: Collections,
    /// Extensions eligible for ingestion (lowercase, with leading dot).
    pub allowed_exts: Vec<String>,
    /// Glob patterns excluded from ingestion and scanning.
    pub ignore_globs: Vec<String>,
    /// Total character budget for an assembled context.
    pub max_ctx_chars: usize,
    /// Per-snippet character cap inside the context.
    pub snippet_chars: usize,
    /// Filename-duplicate count at which `suggest` starts nagging.
    pub suggest_threshold_dupes: usize,
    /// Cosine similarity above which two chunks count as near-duplicates.
    pub min_near_dup_sim: f32,
}

/// Names of the engine's vector collections. Collections never share ids;
/// cross-collection queries are explicit unions performed by the caller.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Collections {
    pub docs: String,
    pub memories: String,
    pub state_notes: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            docs: "docs".to_string(),
            memories: "memories".to_string(),
            state_notes: "state_notes".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_dir: PathBuf::from("./memorybank_db"),
            embed_model: "all-minilm-l6-v2".to_string(),
            embed_url: "http://localhost:11434".to_string(),
            top_k: 5,
            chunk_chars: 1200,
            chunk_overlap: 200,
            collections: Collections::default(),
            allowed_exts: default_allowed_exts(),
            ignore_globs: default_ignore_globs(),
            max_ctx_chars: 8000,
            snippet_chars: 800,
            suggest_threshold_dupes: 3,
            min_near_dup_sim: 0.985,
        }
    }
}

fn default_allowed_exts() -> Vec<String> {
    [
        ".txt", ".md", ".rst", ".py", ".js", ".ts", ".rs", ".json", ".yaml", ".yml", ".toml",
        ".ini", ".cfg", ".css", ".html", ".sql", ".env",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignore_globs() -> Vec<String> {
    [
        "**/.git/**",
        "**/target/**",
        "**/__pycache__/**",
        "**/.venv/**",
        "**/node_modules/**",
        "**/*.lock",
        "**/*.log",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Validate the values that would otherwise fail deep inside a batch.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_chars == 0 {
            return Err(EngineError::Configuration(
                "chunk_chars must be > 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_chars {
            return Err(EngineError::Configuration(format!(
                "chunk_overlap ({}) must be < chunk_chars ({})",
                self.chunk_overlap, self.chunk_chars
            )));
        }
        if self.top_k == 0 {
            return Err(EngineError::Configuration("top_k must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_near_dup_sim) {
            return Err(EngineError::Configuration(format!(
                "min_near_dup_sim must be in [0.0, 1.0], got {}",
                self.min_near_dup_sim
            )));
        }
        if self.embed_model.trim().is_empty() {
            return Err(EngineError::Configuration(
                "embed_model must not be empty".to_string(),
            ));
        }
        for name in [
            &self.collections.docs,
            &self.collections.memories,
            &self.collections.state_notes,
        ] {
            if name.trim().is_empty() {
                return Err(EngineError::Configuration(
                    "collection names must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// True if `ext` (lowercase, with leading dot) is on the allow-list.
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_exts.iter().any(|e| e == ext)
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::file(path, e))?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        EngineError::Configuration(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}
