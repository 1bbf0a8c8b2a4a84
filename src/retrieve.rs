//! Retrieval: turn a query into a budget-capped context block.
//!
//! The query is embedded once, then run against the `docs` and `memories`
//! collections with the same `top_k`. Each collection's hits keep the
//! store's relevance order and the collections concatenate in enumeration
//! order (docs, then memories) — scores are never re-ranked across
//! collections. Blocks are packed greedily into `max_ctx_chars`. A
//! small floor guarantees the leading candidates are represented even when
//! the budget is tight: they get truncated to the remaining budget rather
//! than dropped, so the character ceiling always wins on length and the
//! floor wins on count.

use tracing::debug;

use crate::config::Config;
use crate::embedding::TextEmbedder;
use crate::error::{EngineError, Result};
use crate::store::{Hit, VectorStore};

/// A formatted candidate block.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    pub score: f32,
    pub text: String,
}

/// Assembled retrieval output.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Blocks actually included, in collection-enumeration order.
    pub blocks: Vec<ContextBlock>,
    /// Candidates considered before packing.
    pub candidates: usize,
}

impl RetrievedContext {
    /// Render the packed blocks as one context string.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Embed `query` and assemble context from the docs and memories
/// collections. An empty store yields an empty context, not an error.
pub fn retrieve(
    cfg: &Config,
    store: &VectorStore,
    embedder: &dyn TextEmbedder,
    query: &str,
) -> Result<RetrievedContext> {
    let vectors = embedder.embed(&[query.to_string()])?;
    let vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::BackendUnavailable("embedder returned no vector".into()))?;

    // per-collection store order, collections in enumeration order;
    // never re-ranked across collections
    let mut candidates: Vec<Hit> = Vec::new();
    for name in [&cfg.collections.docs, &cfg.collections.memories] {
        candidates.extend(store.query(name, &vector, cfg.top_k)?);
    }

    let blocks: Vec<ContextBlock> = candidates
        .iter()
        .map(|hit| ContextBlock {
            score: hit.score,
            text: format_block(cfg, hit),
        })
        .collect();

    let packed = pack_blocks(blocks, cfg.max_ctx_chars, std::cmp::min(3, cfg.top_k));
    debug!(
        candidates = candidates.len(),
        included = packed.len(),
        "assembled retrieval context"
    );

    Ok(RetrievedContext {
        candidates: candidates.len(),
        blocks: packed,
    })
}

/// `[{tag}] {snippet}\n(src: {src})`, snippet capped at `snippet_chars`.
fn format_block(cfg: &Config, hit: &Hit) -> String {
    let tag = hit
        .metadata
        .get("tag")
        .and_then(|v| v.as_str())
        .unwrap_or("doc");
    let src = hit
        .metadata
        .get("path")
        .or_else(|| hit.metadata.get("source"))
        .and_then(|v| v.as_str())
        .unwrap_or("memory");
    let snippet = truncate_chars(&hit.document, cfg.snippet_chars);
    format!("[{tag}] {snippet}\n(src: {src})")
}

/// Greedy first-fit into `budget` characters, with the first `floor`
/// candidates force-included (truncated to whatever budget remains).
fn pack_blocks(blocks: Vec<ContextBlock>, budget: usize, floor: usize) -> Vec<ContextBlock> {
    const SEP: usize = 2; // "\n\n" between blocks

    let mut out: Vec<ContextBlock> = Vec::new();
    let mut used = 0usize;

    for (rank, mut block) in blocks.into_iter().enumerate() {
        let sep = if out.is_empty() { 0 } else { SEP };
        let len = block.text.chars().count();

        if used + sep + len <= budget {
            used += sep + len;
            out.push(block);
            continue;
        }

        if rank < floor {
            let remaining = budget.saturating_sub(used + sep);
            if remaining == 0 {
                continue;
            }
            block.text = truncate_chars(&block.text, remaining);
            used += sep + block.text.chars().count();
            out.push(block);
        }
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
