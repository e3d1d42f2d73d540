//! Evidence index: uploaded files attached to controls.
//!
//! Content goes to a [`BlobStore`], metadata to the `evidence` table. Upload
//! order is content first, index row second; deletion is content first, row
//! second. A crash in between can leave a file without a row, never a row
//! pointing at content that was deliberately removed. `sweep_orphans` cleans
//! up the former.

use crate::blob::BlobStore;
use crate::errors::{AttestError, Result};
use crate::model::{Evidence, EvidenceListing, Identity};
use crate::storage::store::EvidenceRow;
use crate::storage::Store;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::sync::{Arc, OnceLock};
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct EvidenceIndex {
    store: Store,
    blobs: Arc<dyn BlobStore>,
    max_upload_bytes: u64,
}

/// Stored content of one evidence record, ready to be streamed out.
pub struct EvidenceContent {
    pub evidence: Evidence,
    pub reader: Box<dyn Read + Send>,
}

impl EvidenceContent {
    pub fn original_filename(&self) -> &str {
        &self.evidence.original_filename
    }
}

impl fmt::Debug for EvidenceContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceContent")
            .field("evidence", &self.evidence)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SweepReport {
    /// Blobs with no index row, now deleted.
    pub removed_blobs: Vec<String>,
    /// Interrupted uploads, now deleted.
    pub removed_uploads: Vec<String>,
    /// Index rows whose content is gone. Reported only.
    pub missing_content: Vec<i64>,
}

impl EvidenceIndex {
    pub fn new(store: Store, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn attach(
        &self,
        control_id: &str,
        original_filename: &str,
        content: &[u8],
        uploader: &Identity,
    ) -> Result<Evidence> {
        let control_id = control_id.trim();
        if control_id.is_empty() {
            return Err(AttestError::invalid("no control selected"));
        }
        if original_filename.trim().is_empty() {
            return Err(AttestError::invalid("no file selected"));
        }
        if content.len() as u64 > self.max_upload_bytes {
            return Err(AttestError::invalid(format!(
                "file is {} bytes, limit is {} bytes",
                content.len(),
                self.max_upload_bytes
            )));
        }
        if !self.store.control_exists(control_id)? {
            return Err(AttestError::not_found("control", control_id));
        }

        let uploaded_at = Utc::now();
        let key = blob_key(uploaded_at, original_filename);
        let digest = sha256_hex(content);
        let location = self.blobs.location(&key);
        self.blobs.put(&key, content)?;

        let row = EvidenceRow {
            control_id,
            filename: &key,
            original_filename,
            file_path: &location,
            file_size: content.len() as u64,
            sha256: &digest,
            uploaded_by: uploader,
            uploaded_at,
        };
        let evidence = match self.store.insert_evidence(&row) {
            Ok(e) => e,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key) {
                    tracing::warn!(
                        event = "attest.evidence.cleanup_failed",
                        key = %key,
                        error = %cleanup,
                        "blob left behind after failed index insert"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            event = "attest.evidence.attached",
            evidence_id = evidence.id,
            control_id = %evidence.control_id,
            size = evidence.file_size,
            uploader = %uploader,
        );
        Ok(evidence)
    }

    pub fn list(&self) -> Result<Vec<EvidenceListing>> {
        self.store.list_evidence()
    }

    /// Deletes content and index row. If the content is already missing the
    /// row is still removed; if deleting the content fails the row is kept.
    pub fn remove(&self, id: i64, actor: &Identity) -> Result<()> {
        let evidence = self
            .store
            .get_evidence(id)?
            .ok_or_else(|| AttestError::not_found("evidence", id))?;

        let existed = self.blobs.delete(&evidence.filename)?;
        if !existed {
            tracing::warn!(
                event = "attest.evidence.content_missing",
                evidence_id = id,
                key = %evidence.filename,
                "content already gone, removing index row"
            );
        }

        if !self.store.delete_evidence_row(id)? {
            return Err(AttestError::not_found("evidence", id));
        }
        tracing::info!(
            event = "attest.evidence.removed",
            evidence_id = id,
            control_id = %evidence.control_id,
            actor = %actor,
        );
        Ok(())
    }

    pub fn fetch_content(&self, id: i64) -> Result<EvidenceContent> {
        let evidence = self
            .store
            .get_evidence(id)?
            .ok_or_else(|| AttestError::not_found("evidence", id))?;
        let reader = self
            .blobs
            .open(&evidence.filename)?
            .ok_or_else(|| AttestError::not_found("evidence content", id))?;
        Ok(EvidenceContent { evidence, reader })
    }

    pub fn count(&self) -> Result<u64> {
        self.store.evidence_count()
    }

    /// Deletes blobs no index row refers to and leftovers of interrupted
    /// uploads; reports rows whose content is missing.
    pub fn sweep_orphans(&self) -> Result<SweepReport> {
        let indexed = self.store.evidence_keys()?;
        let mut report = SweepReport::default();

        for key in self.blobs.keys()? {
            if !indexed.contains(&key) {
                self.blobs.delete(&key)?;
                report.removed_blobs.push(key);
            }
        }
        for name in self.blobs.stale_uploads()? {
            self.blobs.remove_stale_upload(&name)?;
            report.removed_uploads.push(name);
        }
        for listing in self.store.list_evidence()? {
            if !self.blobs.exists(&listing.evidence.filename)? {
                report.missing_content.push(listing.evidence.id);
            }
        }
        report.missing_content.sort_unstable();

        tracing::info!(
            event = "attest.evidence.swept",
            removed_blobs = report.removed_blobs.len(),
            removed_uploads = report.removed_uploads.len(),
            missing_content = report.missing_content.len(),
        );
        Ok(report)
    }
}

/// Storage key for an upload: second-resolution timestamp, a random suffix so
/// identical names uploaded in the same second do not collide, then the
/// sanitised original name.
pub fn blob_key(at: DateTime<Utc>, original_filename: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        at.format("%Y%m%d_%H%M%S"),
        &suffix[..8],
        sanitize_filename(original_filename)
    )
}

/// Reduces a client-supplied file name to `[A-Za-z0-9_.-]`: accented letters
/// fold to their ASCII base, whitespace and path separators become
/// underscores, leading dots are dropped.
pub fn sanitize_filename(name: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    let disallowed =
        DISALLOWED.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"));

    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let joined = ascii
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let cleaned = disallowed.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_matches_upload_conventions() {
        assert_eq!(sanitize_filename("My Policy v2.pdf"), "My_Policy_v2.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\evidence\\scan.png"), "C_evidence_scan.png");
        assert_eq!(sanitize_filename("résumé.docx"), "resume.docx");
        assert_eq!(sanitize_filename("Übersicht Q1..Q2.pdf"), "Ubersicht_Q1..Q2.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn keys_differ_for_same_second_same_name() {
        let at = Utc::now();
        let a = blob_key(at, "report.pdf");
        let b = blob_key(at, "report.pdf");
        assert_ne!(a, b);
        assert!(a.ends_with("_report.pdf"));
        assert_eq!(a.len(), "YYYYmmdd_HHMMSS_".len() + 9 + "report.pdf".len());
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
