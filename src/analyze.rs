//! Analysis entry points.
//!
//! Every entry point funnels into one strictly linear sequence:
//!
//! ```text
//! intake ──▶ extract ──▶ classify ──▶ select | llm ──▶ AnalysisOutput
//! (stage)    (fail-soft)  (keywords)   (body text)
//! ```
//!
//! The staged upload is held by a guard for the whole sequence, so the temp
//! file is gone by the time any of these functions returns, `Ok` or `Err`.

use crate::config::{AnalysisMode, AnalyzerConfig, TextSource};
use crate::error::AnalyzerError;
use crate::output::{AnalysisOutput, AnalysisResult, AnalysisStats, ExtractionSummary};
use crate::pipeline::classify::classify;
use crate::pipeline::extract::{self, ExtractedText};
use crate::pipeline::intake::{self, UploadedDocument};
use crate::pipeline::llm::{self, ChatBackend, ProviderBackend};
use crate::pipeline::{input, select};
use crate::prompts;
use crate::templates::RenderContext;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Analyse an uploaded report.
///
/// # Arguments
/// * `doc`   — the upload as received
/// * `query` — caller query; blank or absent means the configured default
/// * `mode`  — wire value of the analysis type; unknown or absent means comprehensive
/// * `config` — analyzer configuration
///
/// # Errors
/// * [`AnalyzerError::InvalidFormat`] / [`AnalyzerError::EmptyPayload`] before anything touches the disk
/// * [`AnalyzerError::StagingFailed`] when the upload directory is unusable
/// * [`AnalyzerError::LlmApiError`] when an LLM task exhausts its retries
///
/// An unreadable PDF is *not* an error: the analysis runs on fallback text.
pub async fn analyze_document(
    doc: &UploadedDocument,
    query: Option<&str>,
    mode: Option<&str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    match &config.text_source {
        TextSource::Template => run_pipeline(doc, query, mode, config, None).await,
        TextSource::Llm(provider) => {
            let backend = ProviderBackend::new(Arc::clone(provider), config);
            run_pipeline(doc, query, mode, config, Some(&backend)).await
        }
    }
}

/// Analyse an in-memory PDF.
pub async fn analyze_bytes(
    bytes: impl Into<Vec<u8>>,
    filename: impl Into<String>,
    query: Option<&str>,
    mode: Option<&str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let doc = UploadedDocument::new(bytes, filename);
    analyze_document(&doc, query, mode, config).await
}

/// Analyse a local file or an HTTP(S) URL.
pub async fn analyze_path(
    input_str: impl AsRef<str>,
    query: Option<&str>,
    mode: Option<&str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let doc = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    analyze_document(&doc, query, mode, config).await
}

/// Synchronous wrapper around [`analyze_path`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_path_sync(
    input_str: impl AsRef<str>,
    query: Option<&str>,
    mode: Option<&str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_path(input_str, query, mode, config))
}

/// The linear pipeline. `backend` is `Some` only for the LLM text source.
pub(crate) async fn run_pipeline(
    doc: &UploadedDocument,
    query: Option<&str>,
    mode: Option<&str>,
    config: &AnalyzerConfig,
    backend: Option<&dyn ChatBackend>,
) -> Result<AnalysisOutput, AnalyzerError> {
    let total_start = Instant::now();
    let mode = AnalysisMode::parse_lenient(mode);
    let query = config.effective_query(query);
    let processing_id = new_processing_id();
    info!(
        "[{}] Analysing '{}' ({} bytes, mode={})",
        processing_id,
        doc.filename,
        doc.size_bytes(),
        mode
    );

    // ── Step 1: Stage upload ─────────────────────────────────────────────
    let staged = intake::stage_upload(doc, &config.upload_dir)?;

    // ── Step 2: Extract text (never fails) ───────────────────────────────
    let extraction_start = Instant::now();
    let extracted = extract::extract_text(
        staged.path(),
        Arc::clone(&config.extractor),
        &config.fallback_text,
    )
    .await;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 3: Classify ─────────────────────────────────────────────────
    let markers = classify(&extracted.text, &config.keywords);
    debug!("[{}] Markers: {:?}", processing_id, markers.names());

    // ── Step 4: Produce the body ─────────────────────────────────────────
    let generated_at = Utc::now();
    let ctx = RenderContext {
        query: query.clone(),
        generated_at,
        file_size: staged.size_bytes(),
        page_count: extracted.page_count,
        extraction_succeeded: extracted.extraction_succeeded,
        processing_id: processing_id.clone(),
    };

    let generation_start = Instant::now();
    let mut stats = AnalysisStats {
        text_source: config.text_source.label().to_string(),
        extraction_duration_ms,
        ..Default::default()
    };
    let body_text = match backend {
        Some(backend) if mode != AnalysisMode::Verification => {
            generate_with_llm(backend, mode, &query, &extracted, config, &mut stats).await?
        }
        _ => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_analysis_start(0);
            }
            select::select_body(mode, &markers, &ctx)
        }
    };
    stats.generation_duration_ms = generation_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(body_text.len());
    }

    // ── Step 5: Release the staged file before replying ──────────────────
    let filename = staged.filename().to_string();
    let file_size = staged.size_bytes();
    drop(staged);

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "[{}] Analysis complete: {} markers, {} chars, {}ms",
        processing_id,
        markers.len(),
        body_text.len(),
        stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        result: AnalysisResult {
            mode,
            body_text,
            generated_at,
            echoed_query: query,
        },
        processing_id,
        filename,
        file_size,
        extraction: summarise(&extracted),
        markers,
        stats,
    })
}

async fn generate_with_llm(
    backend: &dyn ChatBackend,
    mode: AnalysisMode,
    query: &str,
    extracted: &ExtractedText,
    config: &AnalyzerConfig,
    stats: &mut AnalysisStats,
) -> Result<String, AnalyzerError> {
    let plan = prompts::task_plan(mode);
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(plan.len());
    }

    let out = llm::run_plan(backend, plan, query, &extracted.text, config).await?;
    stats.tasks_run = out.tasks.len();
    stats.total_input_tokens = out.input_tokens;
    stats.total_output_tokens = out.output_tokens;
    Ok(out.body)
}

fn summarise(extracted: &ExtractedText) -> ExtractionSummary {
    ExtractionSummary {
        page_count: extracted.page_count,
        extraction_succeeded: extracted.extraction_succeeded,
        text_chars: extracted.text.chars().count(),
    }
}

/// First 8 hex digits of a fresh v4 UUID, uppercased.
fn new_processing_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::MarkerCategory;
    use crate::pipeline::extract::TextExtractor;
    use crate::pipeline::llm::Completion;
    use futures::future::BoxFuture;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract_pages(&self, _: &[u8]) -> Result<Vec<String>, AnalyzerError> {
            Ok(vec![self.0.to_string()])
        }
    }

    struct EchoBackend {
        calls: AtomicUsize,
    }

    impl ChatBackend for EchoBackend {
        fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> BoxFuture<'a, Result<Completion, String>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                Ok(Completion {
                    content: format!("section {n}"),
                    prompt_tokens: 100,
                    completion_tokens: 20,
                })
            })
        }
    }

    struct DownBackend;

    impl ChatBackend for DownBackend {
        fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> BoxFuture<'a, Result<Completion, String>> {
            Box::pin(async { Err("HTTP 503".to_string()) })
        }
    }

    fn config(dir: &Path, text: &'static str) -> AnalyzerConfig {
        AnalyzerConfig::builder()
            .upload_dir(dir)
            .extractor(Arc::new(FixedText(text)))
            .build()
            .unwrap()
    }

    fn doc() -> UploadedDocument {
        UploadedDocument::new(b"%PDF-1.4 stub".to_vec(), "report.pdf")
    }

    #[tokio::test]
    async fn template_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "Total Cholesterol: 245 mg/dL");
        let out = analyze_document(&doc(), Some("diet?"), Some("nutrition"), &cfg)
            .await
            .unwrap();

        assert_eq!(out.result.mode, AnalysisMode::Nutrition);
        assert_eq!(out.result.echoed_query, "diet?");
        assert!(out.markers.contains(MarkerCategory::LipidRelated));
        assert!(out.result.body_text.contains("omega-3"));
        assert_eq!(out.stats.text_source, "template");
        assert_eq!(out.processing_id.len(), 8);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn llm_pipeline_joins_task_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "Glucose 130");
        let backend = EchoBackend {
            calls: AtomicUsize::new(0),
        };
        let out = run_pipeline(&doc(), None, None, &cfg, Some(&backend))
            .await
            .unwrap();

        assert_eq!(out.stats.tasks_run, 3);
        assert_eq!(out.stats.total_input_tokens, 300);
        assert_eq!(
            out.result.body_text,
            ["section 1", "section 2", "section 3"].join(llm::SECTION_SEPARATOR)
        );
        assert_eq!(out.result.echoed_query, crate::config::DEFAULT_QUERY);
    }

    #[tokio::test]
    async fn verification_skips_the_llm() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "nothing medical here");
        let backend = EchoBackend {
            calls: AtomicUsize::new(0),
        };
        let out = run_pipeline(&doc(), None, Some("verification"), &cfg, Some(&backend))
            .await
            .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(out.result.body_text.contains("APPROVED"));
        assert!(out.result.body_text.contains(&out.processing_id));
    }

    #[tokio::test]
    async fn rejected_upload_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "x");
        let bad = UploadedDocument::new(b"hello".to_vec(), "notes.txt");
        let err = analyze_document(&bad, None, None, &cfg).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidFormat { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_generation_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalyzerConfig::builder()
            .upload_dir(dir.path())
            .extractor(Arc::new(FixedText("Iron 40")))
            .max_retries(0)
            .build()
            .unwrap();

        let err = run_pipeline(&doc(), None, Some("nutrition"), &cfg, Some(&DownBackend))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::LlmApiError { .. }), "{err}");
        assert!(err.to_string().contains("HTTP 503"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn processing_ids_are_uppercase_hex() {
        let id = new_processing_id();
        assert_eq!(id.len(), 8);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
