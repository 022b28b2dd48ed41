//! Configuration types for blood test report analysis.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The config is built once at startup and
//! shared read-only by every request (`Arc<AnalyzerConfig>` in the server),
//! so nothing in it is mutated at runtime.

use crate::error::AnalyzerError;
use crate::pipeline::classify::KeywordTable;
use crate::pipeline::extract::{PdfTextExtractor, TextExtractor};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Query used when the caller sends none (or only whitespace).
pub const DEFAULT_QUERY: &str = "Provide a comprehensive analysis of my blood test report";

/// Placeholder text substituted when the PDF text layer cannot be read.
pub const DEFAULT_FALLBACK_TEXT: &str = "file processed, content unavailable";

/// Disclaimer attached to every successful response.
pub const DEFAULT_DISCLAIMER: &str = "This analysis is for informational purposes only and should not replace professional medical consultation.";

/// Configuration for the analysis pipeline.
///
/// Built via [`AnalyzerConfig::builder()`] or using [`AnalyzerConfig::default()`].
///
/// # Example
/// ```rust
/// use bloodreport::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .upload_dir("/tmp/bloodreport")
///     .max_upload_bytes(5 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Directory that receives per-request temp files. Default: `<system temp>/bloodreport`.
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Query used when the caller's query is blank.
    pub default_query: String,

    /// Text used in place of the report when extraction fails.
    pub fallback_text: String,

    /// Disclaimer attached to every response.
    pub disclaimer: String,

    /// Keyword table driving marker classification.
    pub keywords: KeywordTable,

    /// PDF text-layer extractor. Default: [`PdfTextExtractor`].
    pub extractor: Arc<dyn TextExtractor>,

    /// Where the analysis body comes from. Default: canned templates.
    pub text_source: TextSource,

    /// Sampling temperature for LLM tasks. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per task. Default: 2048.
    pub max_tokens: usize,

    /// Maximum retry attempts per LLM task. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles after each attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Report text beyond this many characters is not sent to the LLM. Default: 12 000.
    pub max_report_chars: usize,

    /// Timeout for downloading a report given as a URL (CLI only). Default: 60.
    pub download_timeout_secs: u64,

    /// Optional per-task progress events (LLM text source only).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join("bloodreport"),
            max_upload_bytes: 20 * 1024 * 1024,
            default_query: DEFAULT_QUERY.to_string(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            keywords: KeywordTable::default(),
            extractor: Arc::new(PdfTextExtractor),
            text_source: TextSource::default(),
            temperature: 0.1,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            max_report_chars: 12_000,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("default_query", &self.default_query)
            .field("keywords", &self.keywords)
            .field("text_source", &self.text_source)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("max_report_chars", &self.max_report_chars)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Return the caller's query, or the default when it is blank.
    pub fn effective_query(&self, query: Option<&str>) -> String {
        match query.map(str::trim) {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => self.default_query.clone(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn default_query(mut self, q: impl Into<String>) -> Self {
        self.config.default_query = q.into();
        self
    }

    pub fn fallback_text(mut self, text: impl Into<String>) -> Self {
        self.config.fallback_text = text.into();
        self
    }

    pub fn disclaimer(mut self, text: impl Into<String>) -> Self {
        self.config.disclaimer = text.into();
        self
    }

    pub fn keywords(mut self, table: KeywordTable) -> Self {
        self.config.keywords = table;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = extractor;
        self
    }

    pub fn text_source(mut self, source: TextSource) -> Self {
        self.config.text_source = source;
        self
    }

    /// Shorthand for `text_source(TextSource::Llm(provider))`.
    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.text_source = TextSource::Llm(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_report_chars(mut self, n: usize) -> Self {
        self.config.max_report_chars = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.default_query.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "default query must not be blank".into(),
            ));
        }
        if c.fallback_text.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "fallback text must not be blank".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AnalyzerError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The caller-selected analysis variant.
///
/// | Mode | Body |
/// |------|------|
/// | `comprehensive` | medical summary + marker findings (default) |
/// | `nutrition` | dietary recommendations |
/// | `exercise` | fitness plan |
/// | `verification` | static document approval, never a rejection |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Comprehensive,
    Nutrition,
    Exercise,
    Verification,
}

impl AnalysisMode {
    /// Parse a wire value, coercing anything unknown (or absent) to `Comprehensive`.
    ///
    /// Matching is exact: `"Nutrition"` is not `"nutrition"`.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("nutrition") => AnalysisMode::Nutrition,
            Some("exercise") => AnalysisMode::Exercise,
            Some("verification") => AnalysisMode::Verification,
            _ => AnalysisMode::Comprehensive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => "comprehensive",
            AnalysisMode::Nutrition => "nutrition",
            AnalysisMode::Exercise => "exercise",
            AnalysisMode::Verification => "verification",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for producing the analysis body.
#[derive(Clone, Default)]
pub enum TextSource {
    /// Canned fragments chosen by marker keywords (no network, deterministic).
    #[default]
    Template,
    /// Sequential role-based LLM tasks via an edgequake-llm provider.
    Llm(Arc<dyn LLMProvider>),
}

impl TextSource {
    /// Short label used in logs and responses.
    pub fn label(&self) -> &'static str {
        match self {
            TextSource::Template => "template",
            TextSource::Llm(_) => "llm",
        }
    }
}

impl fmt::Debug for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Template => f.write_str("Template"),
            TextSource::Llm(_) => f.write_str("Llm(<dyn LLMProvider>)"),
        }
    }
}
