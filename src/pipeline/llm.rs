//! LLM text source: run a mode's task plan, one task after another.
//!
//! A plan is an ordered list of [`TaskSpec`]s (see [`crate::prompts`]). Each
//! task becomes one chat request: the persona's system message plus a user
//! message carrying the query, the report text, and every earlier task's
//! output. There is no scheduler, no delegation, and no fan-out; task *n+1*
//! starts only after task *n* returned.
//!
//! ## Retry Strategy
//!
//! Transient provider errors are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`). With the 500 ms default and three
//! retries the waits are 500 ms → 1 s → 2 s. A task that still fails aborts
//! the whole plan with [`AnalyzerError::LlmApiError`]; there is no partial
//! body, because later tasks depend on earlier output.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::postprocess;
use crate::prompts::TaskSpec;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Separator placed between task outputs in the final body.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// One chat completion.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The single capability the plan runner needs from a model.
///
/// [`ProviderBackend`] adapts any edgequake-llm provider; tests plug in
/// scripted backends.
pub trait ChatBackend: Send + Sync {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, Result<Completion, String>>;
}

/// [`ChatBackend`] over an edgequake-llm provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

impl ChatBackend for ProviderBackend {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, Result<Completion, String>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| e.to_string())?;
            Ok(Completion {
                content: response.content,
                prompt_tokens: response.prompt_tokens as u64,
                completion_tokens: response.completion_tokens as u64,
            })
        })
    }
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Output of one task.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub task: &'static str,
    pub content: String,
    pub retries: u32,
    pub duration_ms: u64,
}

/// Output of a whole plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOutput {
    pub tasks: Vec<TaskOutput>,
    /// Cleaned task outputs joined with [`SECTION_SEPARATOR`].
    pub body: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Run `plan` in order against `backend`.
pub async fn run_plan(
    backend: &dyn ChatBackend,
    plan: &[&'static TaskSpec],
    query: &str,
    report_text: &str,
    config: &AnalyzerConfig,
) -> Result<PlanOutput, AnalyzerError> {
    let report = truncate_chars(report_text, config.max_report_chars);
    let total = plan.len();
    let mut out = PlanOutput::default();

    for (i, task) in plan.iter().enumerate() {
        let step = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_task_start(step, total, task.name);
        }

        let prior: Vec<(&str, &str)> = out
            .tasks
            .iter()
            .map(|t| (t.task, t.content.as_str()))
            .collect();
        let system = task.agent.system_prompt();
        let user = task.user_prompt(query, report, &prior);

        match run_task(backend, task, &system, &user, config).await {
            Ok((completion, output)) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_task_complete(step, total, task.name, output.content.len());
                }
                out.input_tokens += completion.prompt_tokens;
                out.output_tokens += completion.completion_tokens;
                out.tasks.push(output);
            }
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_task_error(step, total, task.name, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    out.body = out
        .tasks
        .iter()
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);
    Ok(out)
}

/// Run one task with retry/backoff.
async fn run_task(
    backend: &dyn ChatBackend,
    task: &TaskSpec,
    system: &str,
    user: &str,
    config: &AnalyzerConfig,
) -> Result<(Completion, TaskOutput), AnalyzerError> {
    let start = Instant::now();
    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Task {}: retry {}/{} after {}ms",
                task.name, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match backend.complete(system, user).await {
            Ok(completion) => {
                let content = postprocess::clean_text(&completion.content);
                if content.is_empty() {
                    warn!("Task {}: attempt {} returned no text", task.name, attempt + 1);
                    last_err = Some("empty response".to_string());
                    continue;
                }
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    "Task {}: {} input tokens, {} output tokens, {}ms",
                    task.name, completion.prompt_tokens, completion.completion_tokens, duration_ms
                );
                let output = TaskOutput {
                    task: task.name,
                    content,
                    retries: attempt,
                    duration_ms,
                };
                return Ok((completion, output));
            }
            Err(e) => {
                warn!("Task {}: attempt {} failed: {}", task.name, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(AnalyzerError::LlmApiError {
        task: task.name.to_string(),
        retries: config.max_retries,
        message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Keep at most `max` characters of `s`, cutting on a char boundary.
/// Exponential delay before retry `attempt` (1-based), saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
