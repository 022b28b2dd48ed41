//! # bloodreport
//!
//! Upload a blood test report PDF, get wellness guidance back as JSON.
//!
//! The service reads the PDF's text layer, looks for marker keywords
//! ("glucose", "cholesterol", "iron", …) and answers in one of four modes:
//! comprehensive, nutrition, exercise, or document verification. The answer
//! comes either from canned templates (default, offline, deterministic) or
//! from a short sequence of persona prompts sent to an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Intake    validate `.pdf` + non-empty, stage in a self-deleting temp file
//!  ├─ 2. Extract   text layer via pdf-extract (spawn_blocking, fail-soft)
//!  ├─ 3. Classify  keyword table → marker categories
//!  ├─ 4. Body      templates, or doctor → nutritionist → trainer LLM tasks
//!  └─ 5. Assemble  JSON reply with disclaimer
//! ```
//!
//! An unreadable PDF never fails the request: the pipeline carries on with a
//! fallback string and reports `extraction_succeeded: false`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bloodreport::{analyze_path, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::default();
//!     let output = analyze_path("labs.pdf", Some("Is my iron low?"), Some("nutrition"), &config).await?;
//!     println!("{}", output.result.body_text);
//!     eprintln!("markers: {:?}", output.markers.names());
//!     Ok(())
//! }
//! ```
//!
//! ## Serving HTTP
//!
//! ```rust,no_run
//! use bloodreport::{serve, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     serve("0.0.0.0:8000".parse().unwrap(), AnalyzerConfig::default()).await
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bloodreport` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bloodreport = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_bytes, analyze_document, analyze_path, analyze_path_sync};
pub use config::{AnalysisMode, AnalyzerConfig, AnalyzerConfigBuilder, TextSource};
pub use error::AnalyzerError;
pub use output::{
    AnalysisOutput, AnalysisResponse, AnalysisResult, AnalysisStats, ExtractionSummary,
    ProcessingInfo,
};
pub use pipeline::classify::{classify, KeywordTable, MarkerCategory, MarkerCategorySet};
pub use pipeline::extract::{ExtractedText, PdfTextExtractor, TextExtractor};
pub use pipeline::intake::UploadedDocument;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::{router, serve, AppState};
