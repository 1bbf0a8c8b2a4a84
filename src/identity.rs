//! Content-addressed identity.
//!
//! Two id families with different lifecycles:
//!
//! - document chunks: `file_hash:ordinal` — re-ingesting unchanged bytes
//!   reproduces the same ids, so upserts are idempotent;
//! - journal entries (memories, state notes): `hash(text[+subtype]):timestamp`
//!   — intentionally time-salted so repeated identical text produces
//!   distinct, append-only entries.
//!
//! All functions here are pure: hashing only ever touches the bytes it is
//! handed.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of a byte slice. File identity is the digest of the
/// raw file bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Identity of chunk `ordinal` within a file with content hash `file_hash`.
pub fn chunk_id(file_hash: &str, ordinal: usize) -> String {
    format!("{file_hash}:{ordinal}")
}

/// Time-salted identity for a free-text journal entry.
///
/// The optional `subtype` is folded into the hash so that, for example, an
/// ingest audit note and a dupe-scan note with identical text still hash
/// apart.
pub fn entry_id(text: &str, subtype: Option<&str>, at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    if let Some(sub) = subtype {
        hasher.update(sub.as_bytes());
    }
    format!(
        "{}:{}",
        hex::encode(hasher.finalize()),
        at.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hello "));
        // SHA-256 hex is 64 chars
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn chunk_ids_differ_by_ordinal_only() {
        let h = hash_bytes(b"file contents");
        assert_eq!(chunk_id(&h, 0), format!("{h}:0"));
        assert_ne!(chunk_id(&h, 0), chunk_id(&h, 1));
    }

    #[test]
    fn entry_ids_are_time_salted() {
        let t1 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 1).unwrap();
        assert_ne!(entry_id("same text", None, t1), entry_id("same text", None, t2));
        assert_eq!(entry_id("same text", None, t1), entry_id("same text", None, t1));
    }

    #[test]
    fn entry_subtype_changes_hash() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_ne!(
            entry_id("note", Some("ingest"), t),
            entry_id("note", Some("dupe-scan"), t)
        );
    }
}
