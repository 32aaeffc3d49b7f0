//! Error types for the rxscan library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzerError`] — **Fatal**: the analysis cannot proceed at all
//!   (image cannot be encoded, completion endpoint unreachable, provider not
//!   configured). Returned as `Err(AnalyzerError)` from the `analyze*`
//!   functions.
//!
//! * [`ExtractionIssue`] — **Non-fatal**: the model answered, but its answer
//!   held no usable JSON. The issue is rendered into
//!   [`crate::record::PrescriptionRecord::error`] so the report stage still
//!   has something to show.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the rxscan library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read but are not a decodable raster image.
    #[error("Input '{source_name}' is not a supported image: {detail}")]
    NotAnImage { source_name: String, detail: String },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// The image could not be re-serialised as JPEG (e.g. unsupported color type).
    #[error("Image encoding failed: {detail}")]
    Encoding { detail: String },

    // ── Capability errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The extraction completion endpoint was unreachable, errored, or timed out.
    #[error("Completion capability unavailable: {reason}")]
    CompletionUnavailable { reason: String },

    /// The drug lookup for one medication failed or timed out.
    #[error("Lookup for '{medication}' failed: {reason}")]
    LookupUnavailable { medication: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a raw completion could not be turned into a prescription record.
///
/// Never returned as an `Err`; its `Display` text is stored in the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionIssue {
    /// The completion contained no `{ ... }` span at all.
    #[error("Failed to parse response: no JSON object found (raw: \"{snippet}\")")]
    NoJsonObject { snippet: String },

    /// A brace span was found but did not parse as the expected JSON shape.
    #[error("Failed to parse response: {detail} (raw: \"{snippet}\")")]
    InvalidJson { detail: String, snippet: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unavailable_display() {
        let e = AnalyzerError::LookupUnavailable {
            medication: "Aspirin".into(),
            reason: "timed out after 30s".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Aspirin"), "got: {msg}");
        assert!(msg.contains("30s"), "got: {msg}");
    }

    #[test]
    fn completion_unavailable_display() {
        let e = AnalyzerError::CompletionUnavailable {
            reason: "HTTP 503".into(),
        };
        assert!(e.to_string().contains("HTTP 503"));
    }

    #[test]
    fn no_json_issue_mentions_kind_and_snippet() {
        let issue = ExtractionIssue::NoJsonObject {
            snippet: "I cannot read this image".into(),
        };
        let msg = issue.to_string();
        assert!(msg.contains("no JSON object found"));
        assert!(msg.contains("I cannot read this image"));
    }

    #[test]
    fn invalid_json_issue_carries_parser_detail() {
        let issue = ExtractionIssue::InvalidJson {
            detail: "expected value at line 1 column 2".into(),
            snippet: "{oops}".into(),
        };
        assert!(issue.to_string().contains("line 1 column 2"));
    }
}
