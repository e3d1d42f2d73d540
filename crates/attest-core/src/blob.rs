//! Byte storage for evidence content.
//!
//! Keys are flat names generated by the evidence index; a store never sees
//! user-supplied paths.

use crate::errors::{AttestError, Result, StorageContext};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

/// Prefix of in-flight uploads. Such files are never listed as keys and are
/// removed by the orphan sweep.
pub const TEMP_PREFIX: &str = ".upload-";

pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`. The content becomes visible under its key
    /// only once fully written.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Opens the content for streaming, `None` if no such key exists.
    fn open(&self, key: &str) -> Result<Option<Box<dyn Read + Send>>>;

    /// Removes the content. Returns `false` when it was already gone.
    fn delete(&self, key: &str) -> Result<bool>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Every stored key, excluding in-flight uploads.
    fn keys(&self) -> Result<Vec<String>>;

    /// Leftovers of interrupted uploads.
    fn stale_uploads(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn remove_stale_upload(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Human-readable location recorded in the index as `file_path`.
    fn location(&self, key: &str) -> String;
}

/// Blob store rooted at a directory, one file per key.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).storage("create evidence directory")?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
        return Err(AttestError::invalid(format!("invalid blob key '{}'", key)));
    }
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let dest = self.path_for(key)?;
        let tmp = self
            .root
            .join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4().simple()));

        let written = (|| -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &dest)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e).storage("write evidence blob");
        }
        Ok(())
    }

    fn open(&self, key: &str) -> Result<Option<Box<dyn Read + Send>>> {
        match File::open(self.path_for(key)?) {
            Ok(f) => Ok(Some(Box::new(f))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).storage("open evidence blob"),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).storage("delete evidence blob"),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.path_for(key)?
            .try_exists()
            .storage("check evidence blob")
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .collect())
    }

    fn stale_uploads(&self) -> Result<Vec<String>> {
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect())
    }

    fn remove_stale_upload(&self, name: &str) -> Result<()> {
        if !name.starts_with(TEMP_PREFIX) || name.contains(['/', '\\']) {
            return Err(AttestError::invalid(format!("not an upload temp file: '{}'", name)));
        }
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).storage("remove stale upload"),
        }
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

impl FsBlobStore {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root).storage("list evidence directory")? {
            let entry = entry.storage("list evidence directory")?;
            if !entry.file_type().storage("list evidence directory")?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_open_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs")).unwrap();

        store.put("20260101_000000_ab12cd34_policy.pdf", b"%PDF").unwrap();
        assert!(store.exists("20260101_000000_ab12cd34_policy.pdf").unwrap());

        let mut buf = Vec::new();
        store
            .open("20260101_000000_ab12cd34_policy.pdf")
            .unwrap()
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, b"%PDF");

        assert!(store.delete("20260101_000000_ab12cd34_policy.pdf").unwrap());
        assert!(!store.delete("20260101_000000_ab12cd34_policy.pdf").unwrap());
        assert!(store.open("20260101_000000_ab12cd34_policy.pdf").unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        for key in ["../escape", "a/b", ".hidden", ""] {
            assert!(store.put(key, b"x").unwrap_err().is_invalid_input(), "{key}");
        }
        store.put("20260101_000000_ab12cd34_Q1..Q2.pdf", b"x").unwrap();
        assert!(store.exists("20260101_000000_ab12cd34_Q1..Q2.pdf").unwrap());
    }

    #[test]
    fn temp_files_are_not_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        store.put("kept.txt", b"x").unwrap();
        std::fs::write(dir.path().join(format!("{TEMP_PREFIX}deadbeef")), b"partial").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["kept.txt".to_string()]);
        let stale = store.stale_uploads().unwrap();
        assert_eq!(stale.len(), 1);
        store.remove_stale_upload(&stale[0]).unwrap();
        assert!(store.stale_uploads().unwrap().is_empty());
    }
}
