//! Document intake: validate an upload and stage it in a scoped temp file.
//!
//! The staged file lives exactly as long as the [`StagedUpload`] guard. Every
//! exit path of a request (success, extraction trouble, an LLM failure, a
//! panic unwinding through the handler) drops the guard and with it the file,
//! so no branch ever calls a cleanup function by hand.
//!
//! File names embed a fresh UUID (`blood_test_report_<uuid>_XXXXXX.pdf`) so
//! concurrent requests sharing one upload directory never collide.

use crate::error::AnalyzerError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded report as received, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Reject uploads that are not `.pdf` files or are empty.
///
/// The extension check is case-insensitive and looks only at the name; the
/// bytes are not sniffed (a mislabelled file degrades at extraction instead).
pub fn validate_upload(doc: &UploadedDocument) -> Result<(), AnalyzerError> {
    if !doc.filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AnalyzerError::InvalidFormat {
            filename: doc.filename.clone(),
        });
    }
    if doc.bytes.is_empty() {
        return Err(AnalyzerError::EmptyPayload);
    }
    Ok(())
}

/// A validated upload persisted to a uniquely named temp file.
///
/// Dropping the guard deletes the file.
pub struct StagedUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
    filename: String,
    size_bytes: usize,
}

impl StagedUpload {
    /// Path of the staged temp file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the client gave the file.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            // Cleanup failure must never replace the request's real outcome.
            match file.close() {
                Ok(()) => debug!("Removed staged upload {}", self.path.display()),
                Err(e) => warn!("Failed to remove staged upload {}: {}", self.path.display(), e),
            }
        }
    }
}

/// Validate `doc` and write it into `upload_dir`.
///
/// Validation runs first, so rejected uploads never reach the filesystem.
pub fn stage_upload(doc: &UploadedDocument, upload_dir: &Path) -> Result<StagedUpload, AnalyzerError> {
    validate_upload(doc)?;

    let staging_err = |source: std::io::Error| AnalyzerError::StagingFailed {
        dir: upload_dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(upload_dir).map_err(staging_err)?;

    let prefix = format!("blood_test_report_{}_", Uuid::new_v4());
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".pdf")
        .tempfile_in(upload_dir)
        .map_err(staging_err)?;
    file.write_all(&doc.bytes).map_err(staging_err)?;
    file.flush().map_err(staging_err)?;

    let path = file.path().to_path_buf();
    debug!("Staged {} ({} bytes) at {}", doc.filename, doc.bytes.len(), path.display());

    Ok(StagedUpload {
        file: Some(file),
        path,
        filename: doc.filename.clone(),
        size_bytes: doc.bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn rejects_non_pdf_before_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("uploads");
        for name in ["report.txt", "report", "report.pdf.exe", "pdf", ""] {
            let doc = UploadedDocument::new(b"%PDF-1.4".to_vec(), name);
            let err = stage_upload(&doc, &dir).err().expect("should reject");
            assert!(matches!(err, AnalyzerError::InvalidFormat { .. }), "{name}: {err}");
        }
        assert!(!dir.exists(), "nothing should be persisted for rejected uploads");
    }

    #[test]
    fn rejects_empty_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = UploadedDocument::new(Vec::new(), "report.pdf");
        let err = stage_upload(&doc, tmp.path()).err().expect("should reject");
        assert!(matches!(err, AnalyzerError::EmptyPayload));
        assert_eq!(count_files(tmp.path()), 0);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let doc = UploadedDocument::new(b"x".to_vec(), "REPORT.PDF");
        assert!(validate_upload(&doc).is_ok());
    }

    #[test]
    fn bare_suffix_counts_as_pdf() {
        for name in [".pdf", "scan.2024.Pdf"] {
            let doc = UploadedDocument::new(b"x".to_vec(), name);
            assert!(validate_upload(&doc).is_ok(), "{name}");
        }
    }

    #[test]
    fn staged_file_is_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = UploadedDocument::new(b"%PDF-1.4 test".to_vec(), "lab.pdf");
        let staged = stage_upload(&doc, tmp.path()).unwrap();
        let path = staged.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), doc.bytes);
        assert_eq!(staged.size_bytes(), doc.size_bytes());
        assert_eq!(staged.filename(), "lab.pdf");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("blood_test_report_"), "got {name}");
        assert!(name.ends_with(".pdf"), "got {name}");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_uploads_get_distinct_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = UploadedDocument::new(b"%PDF".to_vec(), "same.pdf");
        let a = stage_upload(&doc, tmp.path()).unwrap();
        let b = stage_upload(&doc, tmp.path()).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(count_files(tmp.path()), 2);
    }

    #[test]
    fn creates_missing_upload_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        let doc = UploadedDocument::new(b"%PDF".to_vec(), "r.pdf");
        let staged = stage_upload(&doc, &dir).unwrap();
        assert!(staged.path().starts_with(&dir));
    }
}
