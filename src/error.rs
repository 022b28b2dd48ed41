//! Error types for the bloodreport library.
//!
//! There is one fatal error type, [`AnalyzerError`], returned as
//! `Err(AnalyzerError)` from the [`crate::analyze`] entry points.
//!
//! Extraction trouble is deliberately *not* represented here as a surfaced
//! failure: a PDF that cannot be parsed degrades to fallback text and the
//! request carries on (see [`crate::pipeline::extract`]). The only variants a
//! caller is expected to show as a client mistake are the intake rejections,
//! [`AnalyzerError::InvalidFormat`], [`AnalyzerError::EmptyPayload`] and
//! [`AnalyzerError::MissingFile`]; every other variant funnels into one
//! generic "processing error" path.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bloodreport library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The uploaded filename does not carry a `.pdf` extension.
    #[error("Please upload a PDF file (got '{filename}')")]
    InvalidFormat { filename: String },

    /// The upload contained zero bytes.
    #[error("Uploaded file is empty")]
    EmptyPayload,

    /// The multipart request had no `file` field.
    #[error("No file provided")]
    MissingFile,

    /// The request was malformed in some other way (unreadable multipart body).
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // ── Input errors (CLI) ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Report file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Staging errors ────────────────────────────────────────────────────
    /// The upload could not be written to the staging directory.
    #[error("Failed to stage upload in '{dir}': {source}")]
    StagingFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction (internal only) ────────────────────────────────────────
    /// The PDF parser rejected the document.
    ///
    /// Never leaves [`crate::pipeline::extract::extract_text`]; it is turned
    /// into fallback text there.
    #[error("PDF text extraction failed: {0}")]
    ExtractionFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A task in the LLM plan failed after every retry.
    #[error("LLM task '{task}' failed after {retries} retries: {message}")]
    LlmApiError {
        task: String,
        retries: u32,
        message: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed or a keyword table could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// True for rejections caused by the caller's upload rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::InvalidFormat { .. }
                | AnalyzerError::EmptyPayload
                | AnalyzerError::MissingFile
                | AnalyzerError::BadRequest(_)
        )
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::InvalidFormat { .. } => "INVALID_FORMAT",
            AnalyzerError::EmptyPayload => "EMPTY_PAYLOAD",
            AnalyzerError::MissingFile => "MISSING_FILE",
            AnalyzerError::BadRequest(_) => "BAD_REQUEST",
            _ => "PROCESSING_ERROR",
        }
    }
}
