use attest_core::blob::{BlobStore, FsBlobStore, TEMP_PREFIX};
use attest_core::errors::{AttestError, Result as AttestResult};
use attest_core::evidence::{sha256_hex, EvidenceIndex};
use attest_core::model::Identity;
use attest_core::storage::Store;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    blob_dir: PathBuf,
    index: EvidenceIndex,
    alice: Identity,
}

fn fixture() -> anyhow::Result<Fixture> {
    let dir = tempdir()?;
    let blob_dir = dir.path().join("evidence");
    let store = Store::memory()?;
    store.init_schema()?;
    store.seed_controls()?;
    let blobs = Arc::new(FsBlobStore::new(&blob_dir)?);
    Ok(Fixture {
        _dir: dir,
        blob_dir,
        index: EvidenceIndex::new(store, blobs),
        alice: Identity::new("alice")?,
    })
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_attach_stores_content_and_metadata() -> anyhow::Result<()> {
    let f = fixture()?;
    let body = b"access control policy v3";
    let ev = f
        .index
        .attach("A.5.15", "Access Policy.pdf", body, &f.alice)?;

    assert_eq!(ev.control_id, "A.5.15");
    assert_eq!(ev.original_filename, "Access Policy.pdf");
    assert!(ev.filename.ends_with("_Access_Policy.pdf"));
    assert_eq!(ev.file_size, body.len() as u64);
    assert_eq!(ev.sha256, sha256_hex(body));
    assert_eq!(ev.uploaded_by, "alice");
    assert_eq!(files_in(&f.blob_dir), vec![ev.filename.clone()]);

    let mut content = f.index.fetch_content(ev.id)?;
    assert_eq!(content.original_filename(), "Access Policy.pdf");
    let mut buf = Vec::new();
    content.reader.read_to_end(&mut buf)?;
    assert_eq!(buf, body);
    Ok(())
}

#[test]
fn test_same_name_uploads_do_not_collide() -> anyhow::Result<()> {
    let f = fixture()?;
    let a = f.index.attach("A.8.8", "scan.csv", b"first", &f.alice)?;
    let b = f.index.attach("A.8.8", "scan.csv", b"second", &f.alice)?;
    assert_ne!(a.filename, b.filename);
    assert_eq!(files_in(&f.blob_dir).len(), 2);

    let listed = f.index.list()?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].evidence.id, b.id, "newest upload first");
    assert!(listed
        .iter()
        .all(|l| l.control_title.as_deref() == Some("Management of technical vulnerabilities")));
    Ok(())
}

#[test]
fn test_attach_accepts_names_with_repeated_dots() -> anyhow::Result<()> {
    let f = fixture()?;
    let a = f.index.attach("A.5.1", "Q1..Q2 report.pdf", b"x", &f.alice)?;
    assert!(a.filename.ends_with("_Q1..Q2_report.pdf"));
    let b = f.index.attach("A.5.1", "notes...txt", b"y", &f.alice)?;
    assert!(b.filename.ends_with("_notes...txt"));

    let mut buf = Vec::new();
    f.index.fetch_content(a.id)?.reader.read_to_end(&mut buf)?;
    assert_eq!(buf, b"x");
    Ok(())
}

#[test]
fn test_accented_names_fold_to_ascii() -> anyhow::Result<()> {
    let f = fixture()?;
    let ev = f.index.attach("A.6.3", "résumé.docx", b"cv", &f.alice)?;
    assert!(ev.filename.ends_with("_resume.docx"));
    assert_eq!(ev.original_filename, "résumé.docx");
    Ok(())
}

#[test]
fn test_attach_rejects_bad_input_without_writing() -> anyhow::Result<()> {
    let f = fixture()?;

    let err = f.index.attach("A.9.9", "x.txt", b"x", &f.alice).unwrap_err();
    assert!(err.is_not_found());
    assert!(f.index.attach("", "x.txt", b"x", &f.alice).unwrap_err().is_invalid_input());
    assert!(f.index.attach("A.5.1", "  ", b"x", &f.alice).unwrap_err().is_invalid_input());

    let small = f.index.clone().with_max_upload_bytes(4);
    assert!(small
        .attach("A.5.1", "big.bin", b"12345", &f.alice)
        .unwrap_err()
        .is_invalid_input());

    assert!(files_in(&f.blob_dir).is_empty());
    assert_eq!(f.index.count()?, 0);
    Ok(())
}

#[test]
fn test_remove_deletes_content_and_row() -> anyhow::Result<()> {
    let f = fixture()?;
    let ev = f.index.attach("A.5.1", "policy.pdf", b"p", &f.alice)?;
    f.index.remove(ev.id, &f.alice)?;

    assert!(files_in(&f.blob_dir).is_empty());
    assert!(f.index.store().get_evidence(ev.id)?.is_none());
    assert!(f.index.remove(ev.id, &f.alice).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_remove_with_missing_content_still_drops_row() -> anyhow::Result<()> {
    let f = fixture()?;
    let ev = f.index.attach("A.5.1", "policy.pdf", b"p", &f.alice)?;
    std::fs::remove_file(f.blob_dir.join(&ev.filename))?;

    assert!(f.index.fetch_content(ev.id).unwrap_err().is_not_found());
    f.index.remove(ev.id, &f.alice)?;
    assert_eq!(f.index.count()?, 0);
    Ok(())
}

/// Delegates to a real store but refuses every delete.
struct StuckDeletes(FsBlobStore);

impl BlobStore for StuckDeletes {
    fn put(&self, key: &str, bytes: &[u8]) -> AttestResult<()> {
        self.0.put(key, bytes)
    }
    fn open(&self, key: &str) -> AttestResult<Option<Box<dyn Read + Send>>> {
        self.0.open(key)
    }
    fn delete(&self, _key: &str) -> AttestResult<bool> {
        Err(AttestError::storage("delete evidence blob", "permission denied"))
    }
    fn exists(&self, key: &str) -> AttestResult<bool> {
        self.0.exists(key)
    }
    fn keys(&self) -> AttestResult<Vec<String>> {
        self.0.keys()
    }
    fn location(&self, key: &str) -> String {
        self.0.location(key)
    }
}

#[test]
fn test_failed_content_delete_keeps_row() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::memory()?;
    store.init_schema()?;
    store.seed_controls()?;
    let blobs = Arc::new(StuckDeletes(FsBlobStore::new(dir.path())?));
    let index = EvidenceIndex::new(store, blobs);
    let alice = Identity::new("alice")?;

    let ev = index.attach("A.7.1", "badge-log.txt", b"entries", &alice)?;
    let err = index.remove(ev.id, &alice).unwrap_err();
    assert!(err.is_storage_failure());
    assert!(index.store().get_evidence(ev.id)?.is_some());
    assert_eq!(files_in(dir.path()).len(), 1);
    Ok(())
}

#[test]
fn test_sweep_cleans_orphans_and_reports_missing() -> anyhow::Result<()> {
    let f = fixture()?;
    let kept = f.index.attach("A.5.1", "kept.txt", b"k", &f.alice)?;
    let lost = f.index.attach("A.5.2", "lost.txt", b"l", &f.alice)?;
    std::fs::remove_file(f.blob_dir.join(&lost.filename))?;

    std::fs::write(f.blob_dir.join("20250101_000000_deadbeef_stray.txt"), b"s")?;
    std::fs::write(f.blob_dir.join(format!("{TEMP_PREFIX}0123")), b"partial")?;

    let report = f.index.sweep_orphans()?;
    assert_eq!(report.removed_blobs, vec!["20250101_000000_deadbeef_stray.txt"]);
    assert_eq!(report.removed_uploads.len(), 1);
    assert_eq!(report.missing_content, vec![lost.id]);
    assert_eq!(files_in(&f.blob_dir), vec![kept.filename]);

    // Nothing left to do on a second pass except the missing row.
    let again = f.index.sweep_orphans()?;
    assert!(again.removed_blobs.is_empty());
    assert!(again.removed_uploads.is_empty());
    assert_eq!(again.missing_content, vec![lost.id]);
    Ok(())
}
