//! Analysis entry points.
//!
//! [`analyze`] runs the whole pipeline on a decoded image and returns once
//! the report is rendered. The other functions only differ in where the
//! image comes from ([`analyze_path`], [`analyze_bytes`]), where the report
//! goes ([`analyze_to_file`]), or whether the caller is async
//! ([`analyze_sync`]).

use crate::capability::{resolve_completion, resolve_lookup};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::{encode, enrich, extract, input, normalize, report};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Analyse a prescription image.
///
/// # Errors
/// Returns `Err(AnalyzerError)` only for fatal errors:
/// - the image cannot be encoded
/// - no provider is configured, or the extraction completion fails
/// - a lookup fails under [`crate::EnrichmentPolicy::FailFast`]
///
/// An unparseable completion is *not* an error: the output's record then
/// carries only `error`, no lookups run, and the report still renders.
pub async fn analyze(
    image: &DynamicImage,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let total_start = Instant::now();
    info!("Starting analysis: {}x{} image", image.width(), image.height());
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start();
    }

    // ── Step 1: Encode image ─────────────────────────────────────────────
    let encoded = encode::encode_image(image)?;

    // ── Step 2: Resolve capabilities ─────────────────────────────────────
    let completion = resolve_completion(config)?;
    let lookup = resolve_lookup(config, completion.clone())?;

    // ── Step 3: Request extraction ───────────────────────────────────────
    let extraction_start = Instant::now();
    let raw = extract::request_extraction(completion.as_ref(), &encoded, config).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 4: Normalise ────────────────────────────────────────────────
    let record = normalize::normalize(&raw);
    if record.is_error() {
        warn!("Extraction produced no usable record; continuing to report");
    } else {
        info!("Extracted {} medications", record.medications.len());
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(record.medications.len(), record.is_error());
    }

    // ── Step 5: Enrich ───────────────────────────────────────────────────
    let enrichment_start = Instant::now();
    let (insights, failed) = enrich::enrich_counted(&record, lookup.as_ref(), config).await?;
    let enrichment_duration_ms = enrichment_start.elapsed().as_millis() as u64;

    // ── Step 6: Render ───────────────────────────────────────────────────
    let report = report::render_report(Some(&record), &insights);

    let stats = AnalysisStats {
        medications_found: record.medications.len(),
        medications_enriched: insights.len() - failed,
        medications_skipped: record.medications.len() - record.named_medications().count(),
        medications_failed: failed,
        completion_chars: raw.len(),
        extraction_duration_ms,
        enrichment_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete: {}/{} medications enriched, {}ms total",
        stats.medications_enriched, stats.medications_found, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(stats.medications_enriched, stats.medications_found);
    }

    Ok(AnalysisOutput {
        record,
        insights,
        report,
        stats,
    })
}

/// Analyse an image given as a local path or HTTP/HTTPS URL.
pub async fn analyze_path(
    input_str: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let image = input::load_image(input_str.as_ref(), config.download_timeout_secs).await?;
    analyze(&image, config).await
}

/// Analyse an image held in memory (any format the `image` crate can sniff).
pub async fn analyze_bytes(
    bytes: &[u8],
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let image = input::decode_image(bytes, "<memory>")?;
    analyze(&image, config).await
}

/// Analyse an image and write the Markdown report directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let output = analyze_path(input_str, config).await?;
    write_report(output_path.as_ref(), &output.report).await?;
    Ok(output)
}

/// Synchronous wrapper around [`analyze_path`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_path(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

pub(crate) async fn write_report(path: &Path, report: &str) -> Result<(), AnalyzerError> {
    let write_err = |e| AnalyzerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, report).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
