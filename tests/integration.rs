//! End-to-end pipeline tests over temp directories, with a deterministic
//! bag-of-words embedder standing in for a real model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use tempfile::TempDir;

use memorybank::consolidate::{self, KeepStrategy};
use memorybank::{dupes, ingest, notes, retrieve};
use memorybank::{Config, Result, TextEmbedder, VectorStore};

const DIM: usize = 16;

/// Hashes words into a fixed-dimension bag-of-words vector. Texts sharing
/// words get high cosine similarity; disjoint texts stay near zero.
struct StubEmbedder;

impl TextEmbedder for StubEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        "stub-bag-of-words"
    }
}

fn embed_one(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text.to_lowercase().split_whitespace() {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        let h = hasher.finish();
        v[(h % DIM as u64) as usize] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

struct Fixture {
    _tmp: TempDir,
    cfg: Config,
    data: PathBuf,
    db: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    let db = tmp.path().join("db");
    std::fs::create_dir_all(&data).unwrap();

    std::fs::write(
        data.join("rust.md"),
        "Rust programming notes. Cargo builds crates and workspaces. \
         Ownership and borrowing keep memory safe.",
    )
    .unwrap();
    std::fs::write(
        data.join("cooking.md"),
        "Sourdough starter feeding schedule. Hydration ratios for baking \
         bread at home.",
    )
    .unwrap();
    std::fs::write(data.join("image.bin"), [0u8, 159, 146, 150]).unwrap();
    std::fs::create_dir_all(data.join("node_modules/pkg")).unwrap();
    std::fs::write(data.join("node_modules/pkg/index.js"), "ignored").unwrap();

    let cfg = Config {
        data_dir: data.clone(),
        db_dir: db.clone(),
        ..Config::default()
    };
    Fixture {
        _tmp: tmp,
        cfg,
        data,
        db,
    }
}

#[test]
fn ingest_covers_eligible_files_only() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();

    let report = ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.chunks_embedded, 2);
    assert_eq!(store.count(&fx.cfg.collections.docs).unwrap(), 2);
}

#[test]
fn reingesting_unchanged_corpus_is_a_no_op_for_docs() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();

    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    let count_first = store.count(&fx.cfg.collections.docs).unwrap();

    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    assert_eq!(store.count(&fx.cfg.collections.docs).unwrap(), count_first);
}

#[test]
fn editing_a_file_adds_new_chunk_ids() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();
    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    let before = store.count(&fx.cfg.collections.docs).unwrap();

    std::fs::write(
        fx.data.join("rust.md"),
        "Completely rewritten notes about async executors.",
    )
    .unwrap();
    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();

    // old chunk ids remain (content-addressed), the rewrite adds new ones
    assert!(store.count(&fx.cfg.collections.docs).unwrap() > before);
}

#[test]
fn ingest_records_an_audit_state_note() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();
    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    assert!(store.count(&fx.cfg.collections.state_notes).unwrap() >= 1);
}

#[test]
fn dupe_scan_audit_note_is_recorded_on_request() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();

    let report = dupes::scan(&fx.cfg, &fx.data).unwrap();
    notes::record_dupe_scan(&fx.cfg, &store, &StubEmbedder, &report).unwrap();
    assert_eq!(store.count(&fx.cfg.collections.state_notes).unwrap(), 1);
}

#[test]
fn retrieval_surfaces_the_relevant_file() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();
    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();

    let ctx = retrieve::retrieve(
        &fx.cfg,
        &store,
        &StubEmbedder,
        "cargo crates ownership borrowing",
    )
    .unwrap();
    assert!(!ctx.is_empty());
    let rendered = ctx.render();
    assert!(rendered.contains("Cargo builds crates"));
    assert!(rendered.contains("rust.md"));
    assert!(rendered.chars().count() <= fx.cfg.max_ctx_chars);
}

#[test]
fn memories_are_retrieved_alongside_docs() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();
    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();

    notes::save_memory(
        &fx.cfg,
        &store,
        &StubEmbedder,
        "User prefers sourdough hydration around seventy five percent",
        "preference",
        "session-2024-11-02",
    )
    .unwrap();

    let ctx = retrieve::retrieve(
        &fx.cfg,
        &store,
        &StubEmbedder,
        "sourdough hydration preference",
    )
    .unwrap();
    let rendered = ctx.render();
    assert!(rendered.contains("[preference]"));
    assert!(rendered.contains("(src: session-2024-11-02)"));
}

#[test]
fn saving_the_same_memory_twice_appends() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();

    let a = notes::save_memory(&fx.cfg, &store, &StubEmbedder, "note", "t", "s").unwrap();
    // force a different timestamp salt
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let b = notes::save_memory(&fx.cfg, &store, &StubEmbedder, "note", "t", "s").unwrap();

    assert_ne!(a, b);
    assert_eq!(store.count(&fx.cfg.collections.memories).unwrap(), 2);
}

#[test]
fn store_contents_survive_reopen() {
    let fx = fixture();
    {
        let store = VectorStore::open(&fx.db).unwrap();
        ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();
    }
    let store = VectorStore::open(&fx.db).unwrap();
    assert_eq!(store.count(&fx.cfg.collections.docs).unwrap(), 2);

    let ctx = retrieve::retrieve(&fx.cfg, &store, &StubEmbedder, "cargo crates").unwrap();
    assert!(ctx.render().contains("rust.md"));
}

#[test]
fn scan_then_consolidate_resolves_filename_dupes() {
    let fx = fixture();
    std::fs::create_dir_all(fx.data.join("old")).unwrap();
    std::fs::write(fx.data.join("old/rust.md"), "stale copy of the notes").unwrap();

    let report = dupes::scan(&fx.cfg, &fx.data).unwrap();
    assert_eq!(report.filename_groups.len(), 1);
    assert!(report.exact_groups.is_empty());

    let plan = consolidate::plan(&report.filename_groups, KeepStrategy::KeepFirst);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].remove.len(), 1);

    let applied = consolidate::apply(&plan, |_| true);
    assert_eq!(applied.deleted, 1);
    assert_eq!(applied.failed, 0);

    let rescan = dupes::scan(&fx.cfg, &fx.data).unwrap();
    assert!(rescan.is_empty());
}

#[test]
fn plan_only_leaves_the_tree_untouched() {
    let fx = fixture();
    std::fs::write(fx.data.join("copy.md"), std::fs::read(fx.data.join("rust.md")).unwrap())
        .unwrap();

    let report = dupes::scan(&fx.cfg, &fx.data).unwrap();
    assert_eq!(report.exact_groups.len(), 1);

    // planning from exact groups is the caller's job; filename groups here
    // are empty, so the plan is too, and nothing gets deleted
    let plan = consolidate::plan(&report.filename_groups, KeepStrategy::Newest);
    assert!(plan.is_empty());
    assert!(fx.data.join("copy.md").exists());
    assert!(fx.data.join("rust.md").exists());
}

#[test]
fn non_utf8_files_are_identified_by_their_raw_bytes() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();

    // "café" in Latin-1; 0xE9 is not valid standalone UTF-8
    let bytes = [b'c', b'a', b'f', 0xE9];
    std::fs::write(fx.data.join("latin.txt"), bytes).unwrap();

    ingest::ingest(&fx.cfg, &store, &StubEmbedder, &fx.data).unwrap();

    // chunk ids derive from the raw bytes — the same identity the dupe
    // scanner computes — not from the re-encoded text
    let id = format!("{}:0", memorybank::identity::hash_bytes(&bytes));
    let record = store.get(&fx.cfg.collections.docs, &id).unwrap();
    assert!(record.is_some());
    assert_eq!(record.unwrap().document, "caf\u{e9}");
}

#[test]
fn single_file_ingest_bypasses_the_extension_filter() {
    let fx = fixture();
    let store = VectorStore::open(&fx.db).unwrap();
    let odd = fx.data.join("notes.custom");
    std::fs::write(&odd, "deliberately chosen file with an odd extension").unwrap();

    let report = ingest::ingest(&fx.cfg, &store, &StubEmbedder, &odd).unwrap();
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.chunks_embedded, 1);
}
