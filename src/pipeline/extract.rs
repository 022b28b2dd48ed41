//! Text extraction: pull the text layer out of a staged PDF, fail-soft.
//!
//! The recommendation stage only ever looks for keywords, so a report whose
//! text cannot be read is still answerable: it simply matches no markers.
//! [`extract_text`] therefore never returns an error. Any failure (unreadable
//! file, parser error, parser panic, zero pages, no text at all) produces an
//! [`ExtractedText`] with `extraction_succeeded = false` and the configured
//! fallback string.
//!
//! ## Why spawn_blocking?
//!
//! `pdf-extract` is synchronous and CPU-bound, and it is known to panic on
//! some malformed inputs. Running it on the blocking pool keeps Tokio worker
//! threads free, and a panic there surfaces as a `JoinError` that we can
//! treat like any other parse failure.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Text pulled from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Pages the parser reported (0 when the document could not be parsed).
    pub page_count: usize,
    /// Concatenated page text, or the fallback string.
    pub text: String,
    pub extraction_succeeded: bool,
}

impl ExtractedText {
    /// A degraded result carrying `fallback` in place of real text.
    pub fn degraded(page_count: usize, fallback: &str) -> Self {
        Self {
            page_count,
            text: fallback.to_string(),
            extraction_succeeded: false,
        }
    }
}

/// Backend that turns PDF bytes into per-page text.
///
/// Implementations may fail (or even panic); [`extract_text`] absorbs both.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, AnalyzerError>;
}

/// Text-layer extractor built on the `pdf-extract` crate.
///
/// Handles digital PDFs with embedded text. Scanned reports have no text
/// layer and come back blank, which degrades to the fallback text.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, AnalyzerError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| AnalyzerError::ExtractionFailed(e.to_string()))
    }
}

/// Extract the text of the PDF at `path`, degrading to `fallback` on any failure.
pub async fn extract_text(
    path: &Path,
    extractor: Arc<dyn TextExtractor>,
    fallback: &str,
) -> ExtractedText {
    let path = path.to_path_buf();

    let joined = tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)
            .map_err(|e| AnalyzerError::ExtractionFailed(format!("read {}: {e}", path.display())))?;
        extractor.extract_pages(&bytes)
    })
    .await;

    let pages = match joined {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            warn!("Extraction degraded: {}", e);
            return ExtractedText::degraded(0, fallback);
        }
        Err(e) => {
            warn!("Extraction degraded: parser task failed: {}", e);
            return ExtractedText::degraded(0, fallback);
        }
    };

    let page_count = pages.len();
    let text = join_pages(&pages);

    if text.trim().is_empty() {
        warn!("Extraction degraded: {} page(s) but no text layer", page_count);
        return ExtractedText::degraded(page_count, fallback);
    }

    debug!("Extracted {} chars from {} page(s)", text.len(), page_count);
    ExtractedText {
        page_count,
        text,
        extraction_succeeded: true,
    }
}

fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages {
        let page = page.trim_end();
        if page.is_empty() {
            continue;
        }
        text.push_str(page);
        text.push('\n');
    }
    text
}
