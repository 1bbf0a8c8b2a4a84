//! Embedding backends.
//!
//! [`EmbeddingProvider`] is a closed set of backends, resolved exactly once
//! at construction from the configured model string:
//!
//! - a bare model name (`all-minilm-l6-v2`) selects [`LocalModel`] — local
//!   inference via fastembed, fully offline after the one-time model
//!   download;
//! - an `ollama:` prefix (`ollama:nomic-embed-text`) selects
//!   [`ExternalService`] — an Ollama-compatible `/api/embed` HTTP endpoint.
//!
//! A backend that cannot be located fails construction with
//! [`EngineError::BackendUnavailable`]. There is no silent fallback chain:
//! vectors from different providers have different dimensionality and must
//! never be mixed within one collection.
//!
//! [`TextEmbedder`] is the seam the rest of the engine talks through, so
//! tests can substitute a deterministic stub.
//!
//! [`LocalModel`]: EmbeddingProvider::LocalModel
//! [`ExternalService`]: EmbeddingProvider::ExternalService
//! [`EngineError::BackendUnavailable`]: crate::EngineError::BackendUnavailable

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Prefix that routes a model name to the external HTTP service.
const EXTERNAL_PREFIX: &str = "ollama:";

/// Batch text-to-vector interface.
///
/// Implementations must preserve input order and return exactly one vector
/// per input — never a shorter sequence.
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The model identifier this embedder was resolved from.
    fn model_name(&self) -> &str;
}

/// A resolved embedding backend.
pub enum EmbeddingProvider {
    /// Local inference via fastembed.
    #[cfg(feature = "local-embeddings-fastembed")]
    LocalModel {
        name: String,
        model: std::sync::Mutex<fastembed::TextEmbedding>,
    },
    /// An Ollama-compatible HTTP embedding service.
    ExternalService {
        name: String,
        url: String,
        client: reqwest::blocking::Client,
    },
}

impl EmbeddingProvider {
    /// Resolve a backend from a model string.
    ///
    /// `model` selects the backend by prefix convention (see module docs);
    /// `url` is the base URL used for the external service.
    pub fn resolve(model: &str, url: &str) -> Result<Self> {
        if let Some(name) = model.strip_prefix(EXTERNAL_PREFIX) {
            if name.is_empty() {
                return Err(EngineError::Configuration(
                    "empty model name after 'ollama:' prefix".to_string(),
                ));
            }
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .map_err(|e| EngineError::BackendUnavailable(format!("http client: {e}")))?;
            return Ok(EmbeddingProvider::ExternalService {
                name: name.to_string(),
                url: url.trim_end_matches('/').to_string(),
                client,
            });
        }

        Self::resolve_local(model)
    }

    #[cfg(feature = "local-embeddings-fastembed")]
    fn resolve_local(model: &str) -> Result<Self> {
        let fe_model = local_model_id(model)?;
        let loaded = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fe_model).with_show_download_progress(false),
        )
        .map_err(|e| {
            EngineError::BackendUnavailable(format!(
                "failed to initialize local embedding model '{model}': {e}"
            ))
        })?;
        Ok(EmbeddingProvider::LocalModel {
            name: model.to_string(),
            model: std::sync::Mutex::new(loaded),
        })
    }

    #[cfg(not(feature = "local-embeddings-fastembed"))]
    fn resolve_local(model: &str) -> Result<Self> {
        Err(EngineError::BackendUnavailable(format!(
            "local model '{model}' requires the 'local-embeddings-fastembed' feature; \
             use an 'ollama:' model to embed over HTTP"
        )))
    }
}

impl TextEmbedder for EmbeddingProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = match self {
            #[cfg(feature = "local-embeddings-fastembed")]
            EmbeddingProvider::LocalModel { name, model } => {
                debug!(model = %name, batch = texts.len(), "embedding batch locally");
                let mut guard = model
                    .lock()
                    .map_err(|_| EngineError::BackendUnavailable("embedding model poisoned".into()))?;
                guard
                    .embed(texts.to_vec(), None)
                    .map_err(|e| EngineError::BackendUnavailable(format!("local embedding: {e}")))?
            }
            EmbeddingProvider::ExternalService { name, url, client } => {
                debug!(model = %name, batch = texts.len(), "embedding batch via {url}");
                embed_external(client, url, name, texts)?
            }
        };
        if vectors.len() != texts.len() {
            return Err(EngineError::BackendUnavailable(format!(
                "embedding backend returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        match self {
            #[cfg(feature = "local-embeddings-fastembed")]
            EmbeddingProvider::LocalModel { name, .. } => name,
            EmbeddingProvider::ExternalService { name, .. } => name,
        }
    }
}

/// Map a bare model name to a fastembed model id. Unknown names are a
/// configuration error, not a fallback.
#[cfg(feature = "local-embeddings-fastembed")]
fn local_model_id(name: &str) -> Result<fastembed::EmbeddingModel> {
    use fastembed::EmbeddingModel;
    match name {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        other => Err(EngineError::Configuration(format!(
            "unknown local embedding model '{other}'; supported: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large"
        ))),
    }
}

/// POST `{url}/api/embed` with retry/backoff.
///
/// 429 and 5xx responses are retried with exponential backoff (1s, 2s, 4s,
/// 8s, 16s); other 4xx responses fail immediately.
fn embed_external(
    client: &reqwest::blocking::Client,
    url: &str,
    model: &str,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    const MAX_RETRIES: u32 = 5;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(4));
            warn!(attempt, "retrying embedding request in {}s", delay.as_secs());
            std::thread::sleep(delay);
        }

        let resp = client
            .post(format!("{url}/api/embed"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        match resp {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let json: serde_json::Value = response.json().map_err(|e| {
                        EngineError::BackendUnavailable(format!("embedding response: {e}"))
                    })?;
                    return parse_embed_response(&json);
                }
                let text = response.text().unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(EngineError::BackendUnavailable(format!(
                        "embedding service error {status}: {text}"
                    )));
                    continue;
                }
                return Err(EngineError::BackendUnavailable(format!(
                    "embedding service error {status}: {text}"
                )));
            }
            Err(e) => {
                last_err = Some(EngineError::BackendUnavailable(format!(
                    "embedding service unreachable at {url} (is it running?): {e}"
                )));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        EngineError::BackendUnavailable("embedding failed after retries".to_string())
    }))
}

fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            EngineError::BackendUnavailable("invalid response: missing embeddings array".into())
        })?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                EngineError::BackendUnavailable("invalid response: embedding is not an array".into())
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

/// Cosine similarity between two vectors.
///
/// Returns `0.0` for empty vectors or mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
