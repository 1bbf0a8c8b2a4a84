//! Shared eligible-file enumerator.
//!
//! Both the ingestion pipeline and the duplicate scanner filter files
//! through this one module, so extension and ignore-glob semantics can
//! never drift between the two call sites.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{EngineError, Result};

/// An eligible file with the metadata both consumers need.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Compile the configured ignore globs once per walk.
pub fn build_ignore_set(cfg: &Config) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &cfg.ignore_globs {
        let glob = Glob::new(pattern).map_err(|e| {
            EngineError::Configuration(format!("invalid ignore glob '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| EngineError::Configuration(format!("ignore globs: {e}")))
}

/// True if `path` passes the ignore globs and the extension allow-list.
pub fn is_eligible(cfg: &Config, ignore: &GlobSet, path: &Path) -> bool {
    let posix = path.to_string_lossy().replace('\\', "/");
    if ignore.is_match(posix.as_str()) {
        return false;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    cfg.allows_extension(&ext)
}

/// Recursively enumerate eligible files under `root`, sorted by path.
///
/// The sort makes enumeration order deterministic for a given tree; across
/// platforms it is only as stable as the file names themselves.
pub fn eligible_files(cfg: &Config, root: &Path) -> Result<Vec<FileEntry>> {
    if !root.exists() {
        return Err(EngineError::file(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "root does not exist"),
        ));
    }

    let ignore = build_ignore_set(cfg)?;
    let mut entries = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_eligible(cfg, &ignore, path) {
            continue;
        }
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(FileEntry {
            path: path.to_path_buf(),
            modified,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Decode bytes as text, falling back to a byte-preserving Latin-1 decode
/// when they are not valid UTF-8. No eligible file silently drops from
/// the corpus because of its encoding.
pub fn decode_lenient(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Read a file and decode it with [`decode_lenient`].
pub fn read_text_lenient(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::file(path, e))?;
    Ok(decode_lenient(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("keep.md"), "kept").unwrap();
        std::fs::write(root.join("keep.txt"), "kept too").unwrap();
        std::fs::write(root.join("skip.bin"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "ignored").unwrap();
        std::fs::write(root.join("debug.log"), "ignored").unwrap();
        (tmp, Config::default())
    }

    #[test]
    fn filters_by_extension_and_glob() {
        let (tmp, cfg) = fixture();
        let files = eligible_files(&cfg, tmp.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["keep.md", "keep.txt"]);
    }

    #[test]
    fn enumeration_is_sorted() {
        let (tmp, cfg) = fixture();
        std::fs::write(tmp.path().join("aaa.md"), "first").unwrap();
        let files = eligible_files(&cfg, tmp.path()).unwrap();
        let mut sorted = files.clone();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            files.iter().map(|f| &f.path).collect::<Vec<_>>(),
            sorted.iter().map(|f| &f.path).collect::<Vec<_>>()
        );
    }

    #[test]
    fn missing_root_is_a_file_access_error() {
        let cfg = Config::default();
        let err = eligible_files(&cfg, Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, EngineError::FileAccess { .. }));
    }

    #[test]
    fn lenient_reader_preserves_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin.txt");
        // 0xE9 is 'é' in Latin-1 and invalid as a lone UTF-8 byte.
        std::fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
        let text = read_text_lenient(&path).unwrap();
        assert_eq!(text, "caf\u{e9}");
    }
}
