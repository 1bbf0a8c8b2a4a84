//! Deterministic fixed-window text chunker.
//!
//! Normalization and chunking are pure character-offset operations: the
//! same bytes in always produce the same chunks out, which is what makes
//! content-addressed chunk ids (and therefore idempotent re-ingestion)
//! possible. No attempt is made to respect sentence or token boundaries.

use crate::error::{EngineError, Result};

/// Normalize text before chunking: CRLF to LF, runs of horizontal
/// whitespace collapsed to a single space, leading/trailing whitespace
/// trimmed. Newlines are preserved.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_blank = false;
    for ch in text.replace("\r\n", "\n").chars() {
        if ch == ' ' || ch == '\t' {
            if !in_blank {
                out.push(' ');
            }
            in_blank = true;
        } else {
            in_blank = false;
            out.push(ch);
        }
    }
    out.trim().to_string()
}

/// Split normalized `text` into overlapping windows of `size` characters,
/// advancing `size - overlap` per step. The final chunk may be shorter.
/// Text no longer than `size` comes back as a single chunk.
///
/// `overlap >= size` would never terminate and is rejected as a
/// configuration error.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 || overlap >= size {
        return Err(EngineError::Configuration(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }

    let text = normalize(text);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return Ok(vec![text]);
    }

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    Ok(chunks)
}
