//! Progress-callback trait for per-task analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to receive
//! events while the LLM text source works through its task plan. The
//! template source finishes in microseconds and emits only the start and
//! complete events.
//!
//! # Example
//!
//! ```rust
//! use bloodreport::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_task_complete(&self, step: usize, total_steps: usize, task: &str, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{step}/{total_steps} {task} done ({output_len} bytes)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it works through an analysis.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Tasks run strictly one after another, so events for
/// a single analysis never overlap; the server may still run many analyses at
/// once, hence `Send + Sync`.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the text has been extracted and the task plan is known.
    ///
    /// # Arguments
    /// * `total_steps` — number of tasks that will run (0 for the template source)
    fn on_analysis_start(&self, total_steps: usize) {
        let _ = total_steps;
    }

    /// Called just before a task's request is sent.
    ///
    /// # Arguments
    /// * `step`        — 1-indexed task position
    /// * `total_steps` — tasks in the plan
    /// * `task`        — task name, e.g. `"nutrition_analysis"`
    fn on_task_start(&self, step: usize, total_steps: usize, task: &str) {
        let _ = (step, total_steps, task);
    }

    /// Called when a task produced output.
    fn on_task_complete(&self, step: usize, total_steps: usize, task: &str, output_len: usize) {
        let _ = (step, total_steps, task, output_len);
    }

    /// Called when a task failed after all retries; the analysis stops here.
    fn on_task_error(&self, step: usize, total_steps: usize, task: &str, error: &str) {
        let _ = (step, total_steps, task, error);
    }

    /// Called once after the body text has been produced.
    fn on_analysis_complete(&self, body_len: usize) {
        let _ = body_len;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
