//! CLI binary for bloodreport.
//!
//! A thin shim over the library crate: `serve` starts the HTTP service,
//! `analyze` runs the same pipeline on one local file or URL.

use anyhow::{Context, Result};
use bloodreport::pipeline::input;
use bloodreport::{
    analyze_path, serve, AnalysisProgressCallback, AnalyzerConfig, KeywordTable, ProgressCallback,
};
use clap::{Args, Parser, Subcommand};
use edgequake_llm::{LLMProvider, ProviderFactory};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for the LLM text source: one bar step per task.
struct CliProgressCallback {
    bar: ProgressBar,
    task_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(label: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(format!("Reading {label}…"));
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            task_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.task_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, total_steps: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos}/{len} tasks  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_steps as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Analysing");
    }

    fn on_task_start(&self, _step: usize, _total_steps: usize, task: &str) {
        if let Ok(mut t) = self.task_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(task.to_string());
    }

    fn on_task_complete(&self, step: usize, total_steps: usize, task: &str, output_len: usize) {
        self.bar.println(format!(
            "  {} Task {}/{}  {:<20} {}  {}",
            green("✓"),
            step,
            total_steps,
            task,
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_task_error(&self, step: usize, total_steps: usize, task: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Task {}/{}  {:<20} {}  {}",
            red("✗"),
            step,
            total_steps,
            task,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.abandon();
    }

    fn on_analysis_complete(&self, body_len: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!("{} {} chars of analysis", green("✔"), bold(&body_len.to_string()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the HTTP service on port 8000
  bloodreport serve --port 8000

  # Analyse a local report with the canned templates
  bloodreport analyze labs.pdf --mode nutrition --query "Is my cholesterol OK?"

  # Same, but with an LLM writing the answer
  bloodreport analyze labs.pdf --llm --provider openai --model gpt-4.1-mini

  # Full JSON reply, exactly as POST /analyze would return it
  bloodreport analyze https://lab.example/reports/2024-03.pdf --json

  # Custom keyword table
  bloodreport serve --keywords markers.json

ANALYSIS MODES:
  comprehensive (default), nutrition, exercise, verification
  Unknown modes are treated as comprehensive.

KEYWORD TABLE FORMAT:
  {"glucose_related": ["glucose", "hba1c"], "lipid_related": ["ldl", "hdl"]}

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used with --llm when --provider is not given
  EDGEQUAKE_MODEL         Model used with --llm when --model is not given
  RUST_LOG                Overrides --verbose / --quiet
"#;

/// Analyse blood test report PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "bloodreport",
    version,
    about = "Blood test report analyzer: upload a PDF, get wellness guidance as JSON",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "BLOODREPORT_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind.
        #[arg(long, env = "BLOODREPORT_PORT", default_value_t = 8000)]
        port: u16,

        /// Directory for per-request temp files.
        #[arg(long, env = "BLOODREPORT_UPLOAD_DIR")]
        upload_dir: Option<PathBuf>,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "BLOODREPORT_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,
    },

    /// Analyse one report and print the result.
    Analyze {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Question to answer; blank means the default query.
        #[arg(short = 'Q', long, env = "BLOODREPORT_QUERY")]
        query: Option<String>,

        /// comprehensive, nutrition, exercise, or verification.
        #[arg(short, long, env = "BLOODREPORT_MODE", default_value = "comprehensive")]
        mode: String,

        /// Print the full JSON reply instead of the analysis text.
        #[arg(long, env = "BLOODREPORT_JSON")]
        json: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "BLOODREPORT_DOWNLOAD_TIMEOUT", default_value_t = 60)]
        download_timeout: u64,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Write the analysis with an LLM instead of canned templates.
    #[arg(long, global = true, env = "BLOODREPORT_LLM")]
    llm: bool,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "BLOODREPORT_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "BLOODREPORT_MODEL")]
    model: Option<String>,

    /// JSON file mapping marker categories to keyword lists.
    #[arg(long, global = true, env = "BLOODREPORT_KEYWORDS")]
    keywords: Option<PathBuf>,

    /// Max LLM output tokens per task.
    #[arg(long, global = true, env = "BLOODREPORT_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "BLOODREPORT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per LLM task.
    #[arg(long, global = true, env = "BLOODREPORT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BLOODREPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "BLOODREPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar covers interactive `analyze` runs; keep library INFO
    // logs out of its way.
    let interactive = matches!(cli.command, Command::Analyze { json: false, .. });
    let filter = if cli.common.verbose {
        "debug"
    } else if cli.common.quiet || (interactive && cli.common.llm) {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            ref host,
            port,
            ref upload_dir,
            max_upload_mb,
        } => {
            let mut builder = base_builder(&cli.common)
                .await?
                .max_upload_bytes(max_upload_mb * 1024 * 1024);
            if let Some(dir) = upload_dir {
                builder = builder.upload_dir(dir);
            }
            let config = builder.build().context("Invalid configuration")?;

            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid bind address '{host}:{port}'"))?;
            info!("Starting {} v{}", bloodreport::server::SERVICE_NAME, env!("CARGO_PKG_VERSION"));
            serve(addr, config).await.context("HTTP server failed")?;
        }

        Command::Analyze {
            ref input,
            ref query,
            ref mode,
            json,
            download_timeout,
        } => {
            let show_progress = cli.common.llm && !cli.common.quiet && !json;
            let mut builder = base_builder(&cli.common)
                .await?
                .download_timeout_secs(download_timeout);
            if show_progress {
                let cb: ProgressCallback = CliProgressCallback::new(&input::display_name(input));
                builder = builder.progress_callback(cb);
            }
            let config = builder.build().context("Invalid configuration")?;

            let output = analyze_path(input, query.as_deref(), Some(mode.as_str()), &config)
                .await
                .context("Analysis failed")?;

            if json {
                let reply = bloodreport::pipeline::assemble::assemble(&output, &config.disclaimer);
                let json =
                    serde_json::to_string_pretty(&reply).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(output.result.body_text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !output.result.body_text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }

                if !cli.common.quiet {
                    let markers = output.markers.names();
                    eprintln!(
                        "{} {}  mode={}  markers=[{}]  {}ms",
                        cyan("◆"),
                        bold(&output.filename),
                        output.result.mode,
                        markers.join(", "),
                        output.stats.total_duration_ms,
                    );
                    if !output.extraction.extraction_succeeded {
                        eprintln!("  {} no readable text layer; fallback text used", red("!"));
                    }
                    if output.stats.tasks_run > 0 {
                        eprintln!(
                            "   {} tokens in  /  {} tokens out",
                            dim(&output.stats.total_input_tokens.to_string()),
                            dim(&output.stats.total_output_tokens.to_string()),
                        );
                    }
                    eprintln!("{}", dim(&config.disclaimer));
                }
            }
        }
    }

    Ok(())
}

/// Map the shared flags to a config builder.
async fn base_builder(common: &CommonArgs) -> Result<bloodreport::AnalyzerConfigBuilder> {
    let mut builder = AnalyzerConfig::builder()
        .max_tokens(common.max_tokens)
        .temperature(common.temperature)
        .max_retries(common.max_retries);

    if let Some(ref path) = common.keywords {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read keyword table from {:?}", path))?;
        let table = KeywordTable::from_json(&raw)
            .with_context(|| format!("Invalid keyword table in {:?}", path))?;
        builder = builder.keywords(table);
    }

    if common.llm {
        let provider = resolve_provider(common)?;
        info!("LLM text source enabled");
        builder = builder.llm_provider(provider);
    }

    Ok(builder)
}

/// Resolve the LLM provider, from most-specific to least-specific:
/// `--provider`/`--model`, then `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
/// then whatever API key `ProviderFactory::from_env` finds.
fn resolve_provider(common: &CommonArgs) -> Result<Arc<dyn LLMProvider>> {
    if let Some(ref name) = common.provider {
        let model = common.model.as_deref().unwrap_or("gpt-4.1-nano");
        return ProviderFactory::create_llm_provider(name, model)
            .with_context(|| format!("LLM provider '{name}' is not configured"));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let model = common.model.clone().unwrap_or(model);
            return ProviderFactory::create_llm_provider(&prov, &model)
                .with_context(|| format!("LLM provider '{prov}' is not configured"));
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().context(
        "No LLM provider could be auto-detected from environment. \
         Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.",
    )?;
    Ok(llm_provider)
}
