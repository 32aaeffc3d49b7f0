//! CLI binary for rxscan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalyzerConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rxscan::{
    analyze_path, analyze_to_file, AnalysisOutput, AnalysisProgressCallback, AnalyzerConfig,
    EnrichmentPolicy, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the model reads the image,
/// then a bar over the medication lookups with one log line per drug.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Reading");
        bar.set_message("Loading image…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the bar style once the medication count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos:>2}/{len} drugs  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Looking up");
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self) {
        self.bar.set_message("Extracting prescription…");
    }

    fn on_extraction_complete(&self, medications: usize, failed: bool) {
        if failed {
            self.bar.println(format!(
                "{} {}",
                yellow("⚠"),
                bold("Could not parse the model's answer; the report will carry the error")
            ));
        } else {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Found {medications} medications"))
            ));
        }
        self.activate_bar(medications);
    }

    fn on_medication_start(&self, _index: usize, _total: usize, medication: &str) {
        self.bar.set_message(medication.to_string());
    }

    fn on_medication_complete(&self, index: usize, total: usize, medication: &str) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}",
            green("✓"),
            index,
            total,
            medication
        ));
        self.bar.inc(1);
    }

    fn on_medication_error(&self, index: usize, total: usize, medication: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            medication,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_medication_skipped(&self, index: usize, total: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}",
            dim("–"),
            index,
            total,
            dim("unnamed entry skipped")
        ));
        self.bar.inc(1);
    }

    fn on_analysis_complete(&self, enriched: usize, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} medications enriched",
            if enriched == total { green("✔") } else { cyan("⚠") },
            bold(&enriched.to_string()),
            total
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a local scan (report on stdout)
  rxscan prescription.jpg

  # Write the report to a file
  rxscan prescription.jpg -o report.md

  # Analyse an image from a URL with Gemini
  rxscan --provider gemini https://example.org/rx.png

  # Keep going when a drug lookup fails
  rxscan --continue-on-lookup-error prescription.jpg

  # Machine-readable output
  rxscan --json prescription.jpg > analysis.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  RXSCAN_LLM_PROVIDER     Override provider (gemini, openai, anthropic, ollama)
  RXSCAN_MODEL            Override model ID
  FDA_API_KEY             Optional openFDA key (raises rate limits)

  Variables are also read from a .env file in the working directory.
"#;

/// Analyse prescription images with Vision LLMs and openFDA.
#[derive(Parser, Debug)]
#[command(
    name = "rxscan",
    version,
    about = "Analyse prescription images with Vision LLMs and openFDA",
    long_about = "Extract patient, date, medications and doctor from a prescription image \
using a Vision Language Model, look up each medication on openFDA, and print a Markdown report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path (JPEG, PNG) or HTTP/HTTPS URL.
    input: String,

    /// Write the Markdown report to this file instead of stdout.
    #[arg(short, long, env = "RXSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "RXSCAN_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "RXSCAN_LLM_PROVIDER")]
    provider: Option<String>,

    /// openFDA API key.
    #[arg(long, env = "FDA_API_KEY", hide_env_values = true)]
    fda_api_key: Option<String>,

    /// Record failed lookups in the report instead of aborting.
    #[arg(long, env = "RXSCAN_CONTINUE_ON_LOOKUP_ERROR")]
    continue_on_lookup_error: bool,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, env = "RXSCAN_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "RXSCAN_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RXSCAN_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Output structured JSON (AnalysisOutput) instead of the report.
    #[arg(long, env = "RXSCAN_JSON")]
    json: bool,

    /// Disable progress output.
    #[arg(long, env = "RXSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RXSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RXSCAN_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RXSCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "RXSCAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Per-medication lookup timeout in seconds.
    #[arg(long, env = "RXSCAN_LOOKUP_TIMEOUT", default_value_t = 30)]
    lookup_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let output = if let Some(ref output_path) = cli.output {
        let output = analyze_to_file(&cli.input, output_path, &config)
            .await
            .context("Analysis failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}ms  →  {}",
                if output.extraction_failed() { cyan("⚠") } else { green("✔") },
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        output
    } else {
        let output = analyze_path(&cli.input, &config)
            .await
            .context("Analysis failed")?;
        if !cli.json {
            print_sections(&output)?;
        }
        output
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet && !show_progress && !cli.json {
        let stats = &output.stats;
        eprintln!(
            "Enriched {}/{} medications in {}ms",
            stats.medications_enriched, stats.medications_found, stats.total_duration_ms
        );
        if stats.medications_failed > 0 {
            eprintln!("  {} lookups failed", stats.medications_failed);
        }
    }
    if output.extraction_failed() && !cli.quiet {
        if let Some(ref err) = output.record.error {
            eprintln!("{} {}", yellow("extraction:"), dim(err));
        }
    }

    Ok(())
}

/// Print the three panels: extracted record, drug insights, report.
fn print_sections(output: &AnalysisOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let record =
        serde_json::to_string_pretty(&output.record).context("Failed to serialise record")?;
    let insights =
        serde_json::to_string_pretty(&output.insights).context("Failed to serialise insights")?;

    writeln!(handle, "{}", bold("Extracted Data")).context("Failed to write to stdout")?;
    writeln!(handle, "{record}\n").context("Failed to write to stdout")?;
    writeln!(handle, "{}", bold("Drug Insights")).context("Failed to write to stdout")?;
    writeln!(handle, "{insights}\n").context("Failed to write to stdout")?;
    writeln!(handle, "{}", bold("Report")).context("Failed to write to stdout")?;
    handle
        .write_all(output.report.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .lookup_timeout_secs(cli.lookup_timeout);

    if cli.continue_on_lookup_error {
        builder = builder.enrichment_policy(EnrichmentPolicy::Continue);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.fda_api_key {
        builder = builder.fda_api_key(key.clone());
    }
    if let Some(ref path) = cli.extraction_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read extraction prompt from {:?}", path))?;
        builder = builder.extraction_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
