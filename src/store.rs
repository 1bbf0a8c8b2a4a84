//! Named-collection vector store.
//!
//! [`VectorStore`] owns a directory and keeps one independently-indexed
//! collection per logical name (`docs`, `memories`, `state_notes`). Each
//! collection is a flat set of records keyed by id; upsert replaces by id,
//! so re-writing the same content-addressed chunk is idempotent.
//!
//! The similarity metric is cosine, fixed when a collection is created and
//! recorded in its file. Changing the metric of an existing collection is
//! undefined; recreate the collection instead.
//!
//! Persistence is one JSON file per collection under the store directory,
//! written atomically (temp file + rename). The file system remains the
//! source of truth for document content; this store is a derived,
//! rebuildable cache.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::cosine_similarity;
use crate::error::{EngineError, Result};

/// The only supported similarity metric.
const METRIC_COSINE: &str = "cosine";

/// A stored vector record: document text, caller metadata, and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    pub vector: Vec<f32>,
}

/// A ranked query hit.
#[derive(Debug, Clone)]
pub struct Hit {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    /// Cosine similarity to the query vector, higher is better.
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    metric: String,
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct Collection {
    records: BTreeMap<String, Record>,
}

/// Directory-backed vector store with named collections.
pub struct VectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl VectorStore {
    /// Open (or create) a store rooted at `dir`, loading every collection
    /// file found there.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| EngineError::file(dir, e))?;

        let mut collections = HashMap::new();
        let entries = std::fs::read_dir(dir).map_err(|e| EngineError::file(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::file(dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content =
                std::fs::read_to_string(&path).map_err(|e| EngineError::file(&path, e))?;
            let file: CollectionFile = serde_json::from_str(&content).map_err(|e| {
                EngineError::Store(format!("corrupt collection file {}: {e}", path.display()))
            })?;
            if file.metric != METRIC_COSINE {
                return Err(EngineError::Store(format!(
                    "collection '{name}' uses metric '{}'; only cosine is supported — \
                     recreate the collection",
                    file.metric
                )));
            }
            let records = file.records.into_iter().map(|r| (r.id.clone(), r)).collect();
            collections.insert(name.to_string(), Collection { records });
            debug!(collection = name, "loaded collection");
        }

        Ok(Self {
            root: dir.to_path_buf(),
            collections: RwLock::new(collections),
        })
    }

    /// Ensure a collection exists, creating an empty one (cosine metric)
    /// if needed.
    pub fn get_or_create(&self, name: &str) -> Result<()> {
        let snapshot = {
            let mut guard = self.write_guard()?;
            if guard.contains_key(name) {
                return Ok(());
            }
            let coll = guard.entry(name.to_string()).or_default();
            Self::snapshot(coll)
        };
        self.persist(name, &snapshot)
    }

    /// Insert or replace records by id. Replacement is atomic from the
    /// caller's point of view: vector, metadata, and document change
    /// together, last write wins.
    pub fn upsert(&self, collection: &str, records: Vec<Record>) -> Result<()> {
        let snapshot = {
            let mut guard = self.write_guard()?;
            let coll = guard.entry(collection.to_string()).or_default();
            for record in records {
                coll.records.insert(record.id.clone(), record);
            }
            Self::snapshot(coll)
        };
        self.persist(collection, &snapshot)
    }

    /// Rank every record in `collection` by cosine similarity to `vector`
    /// and return the best `top_k`. An unknown collection yields an empty
    /// result, not an error.
    pub fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<Hit>> {
        let guard = self.read_guard()?;
        let Some(coll) = guard.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<Hit> = coll
            .records
            .values()
            .map(|r| Hit {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(vector, &r.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Fetch a single record by id.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let guard = self.read_guard()?;
        Ok(guard
            .get(collection)
            .and_then(|c| c.records.get(id))
            .cloned())
    }

    /// Number of records in a collection (0 for unknown collections).
    pub fn count(&self, collection: &str) -> Result<usize> {
        let guard = self.read_guard()?;
        Ok(guard.get(collection).map(|c| c.records.len()).unwrap_or(0))
    }

    /// Names of all collections currently present.
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let guard = self.read_guard()?;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// The directory this store persists into.
    pub fn dir(&self) -> &Path {
        &self.root
    }

    fn snapshot(coll: &Collection) -> CollectionFile {
        CollectionFile {
            metric: METRIC_COSINE.to_string(),
            records: coll.records.values().cloned().collect(),
        }
    }

    fn persist(&self, name: &str, file: &CollectionFile) -> Result<()> {
        let path = self.root.join(format!("{name}.json"));
        let tmp = self.root.join(format!("{name}.json.tmp"));
        let body = serde_json::to_string(file)
            .map_err(|e| EngineError::Store(format!("serialize collection '{name}': {e}")))?;
        std::fs::write(&tmp, body).map_err(|e| EngineError::file(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| EngineError::file(&path, e))?;
        Ok(())
    }

    fn read_guard(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| EngineError::Store("store lock poisoned".to_string()))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| EngineError::Store("store lock poisoned".to_string()))
    }
}
