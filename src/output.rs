//! Output types returned by the analysis pipeline.

use crate::config::AnalysisMode;
use crate::pipeline::classify::MarkerCategorySet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The analysis itself: what was asked, in which mode, and the answer.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mode: AnalysisMode,
    pub body_text: String,
    pub generated_at: DateTime<Utc>,
    /// The effective query (the caller's, or the default when blank).
    pub echoed_query: String,
}

/// What extraction produced, minus the text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub page_count: usize,
    pub extraction_succeeded: bool,
    /// Characters of extracted (or fallback) text.
    pub text_chars: usize,
}

/// Timing and token accounting for one analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// `"template"` or `"llm"`.
    pub text_source: String,
    /// LLM tasks run (0 for the template source and for verification).
    pub tasks_run: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extraction_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything the pipeline knows about one analysed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub result: AnalysisResult,
    /// 8-character uppercase identifier, also shown in verification reports.
    pub processing_id: String,
    pub filename: String,
    pub file_size: usize,
    pub extraction: ExtractionSummary,
    pub markers: MarkerCategorySet,
    pub stats: AnalysisStats,
}

/// JSON body of a successful `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub message: String,
    pub query: String,
    pub analysis_type: AnalysisMode,
    pub analysis: String,
    pub file_processed: String,
    /// Upload size rendered as `"<n> bytes"`.
    pub file_size: String,
    pub markers_detected: Vec<String>,
    pub processing_info: ProcessingInfo,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub text_source: String,
    pub extraction_succeeded: bool,
    pub pages: usize,
    pub processing_id: String,
}
