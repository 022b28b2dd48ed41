//! Input resolution for the command line: turn a path or URL into an
//! [`UploadedDocument`], the same value the HTTP handler builds from a
//! multipart field.
//!
//! Nothing is validated here beyond "the bytes could be read". Extension and
//! emptiness checks belong to [`crate::pipeline::intake`], so both entry
//! points reject exactly the same inputs.

use crate::error::AnalyzerError;
use crate::pipeline::intake::UploadedDocument;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the document named by `input`, downloading it when it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedDocument, AnalyzerError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file into memory.
pub async fn read_local(path: &Path) -> Result<UploadedDocument, AnalyzerError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AnalyzerError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => AnalyzerError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local report: {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedDocument::new(bytes, filename))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, AnalyzerError> {
    info!("Downloading report from: {}", url);

    let failed = |reason: String| AnalyzerError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    let filename = filename_from_url(url);

    info!("Downloaded {} bytes as '{}'", bytes.len(), filename);
    Ok(UploadedDocument::new(bytes.to_vec(), filename))
}

/// Last path segment of `url` when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Display name for a CLI input, used in progress output.
pub fn display_name(input: &str) -> String {
    if is_url(input) {
        filename_from_url(input)
    } else {
        PathBuf::from(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filenames_from_urls() {
        assert_eq!(filename_from_url("https://lab.example/r/blood.pdf"), "blood.pdf");
        assert_eq!(filename_from_url("https://lab.example/r/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://lab.example/latest"), "downloaded.pdf");
        assert_eq!(display_name("/tmp/x/report.pdf"), "report.pdf");
    }

    #[tokio::test]
    async fn reads_local_file() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"%PDF-1.4 test").unwrap();
        let doc = read_local(f.path()).await.unwrap();
        assert_eq!(doc.size_bytes(), 13);
        assert!(doc.filename.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::FileNotFound { .. }));
    }
}
