//! # Memorybank
//!
//! A local retrieval memory engine: ingest plain-text files into a
//! content-addressed vector store, retrieve budget-capped context for a
//! query, and keep the corpus healthy with duplicate detection and
//! consolidation.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//! │  walker   │──▶│   ingest      │──▶│ VectorStore │
//! │ filter FS │   │ chunk+embed  │   │ docs/mems/  │
//! └─────┬─────┘   └──────────────┘   │ state_notes │
//!       │                            └──────┬──────┘
//!       ▼                                   ▼
//! ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//! │   dupes   │──▶│ consolidate   │   │  retrieve    │
//! │ scan/near │   │ plan → apply │   │ pack budget │
//! └───────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! The file system stays the source of truth; the store is a derived,
//! rebuildable cache. Chunk ids are content-addressed, so re-ingesting an
//! unchanged corpus is a no-op.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with defaults |
//! | [`identity`] | Content hashing and id construction |
//! | [`chunk`] | Normalization and sliding-window chunking |
//! | [`embedding`] | Local and external embedding backends |
//! | [`store`] | Named-collection vector store |
//! | [`walker`] | Shared eligible-file enumeration |
//! | [`ingest`] | Walk → chunk → embed → upsert pipeline |
//! | [`notes`] | Memories and audit state notes |
//! | [`retrieve`] | Budget-capped context assembly |
//! | [`dupes`] | Filename, exact, and near-duplicate detection |
//! | [`consolidate`] | Duplicate resolution planning and apply |
//! | [`suggest`] | Corpus health suggestions |
//! | [`watch`] | Debounced re-ingest on file changes |

pub mod chunk;
pub mod config;
pub mod consolidate;
pub mod dupes;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod notes;
pub mod retrieve;
pub mod store;
pub mod suggest;
pub mod walker;
#[cfg(feature = "file-watcher")]
pub mod watch;

pub use config::{load_config, Config};
pub use embedding::{EmbeddingProvider, TextEmbedder};
pub use error::{EngineError, Result};
pub use store::{Hit, Record, VectorStore};
