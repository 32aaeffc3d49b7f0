//! # rxscan
//!
//! Read a photographed medical prescription with a vision-capable LLM, look
//! up each prescribed drug on openFDA, and render a Markdown report.
//!
//! ## Why this crate?
//!
//! Prescriptions are handwritten, photographed at an angle, and stamped over.
//! Classic OCR returns a soup of characters with no notion of "this is the
//! dosage of that drug". A vision model reads the sheet the way a pharmacist
//! would and answers with a structured record. Models are unreliable JSON
//! emitters though, so the interesting part of this crate is recovering a
//! typed [`PrescriptionRecord`] from whatever text comes back, and carrying on
//! gracefully when it cannot.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (path / URL / bytes)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, decode
//!  ├─ 2. Encode     re-serialise as JPEG → base64
//!  ├─ 3. Extract    one vision completion with the extraction prompt
//!  ├─ 4. Normalise  greedy brace span → typed record (never fails)
//!  ├─ 5. Enrich     sequential openFDA lookup + agent summary per drug
//!  └─ 6. Report     deterministic Markdown
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rxscan::{analyze_path, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = AnalyzerConfig::from_env();
//!     let output = analyze_path("prescription.jpg", &config).await?;
//!     println!("{}", output.report);
//!     Ok(())
//! }
//! ```
//!
//! ## Plugging in your own model or lookup
//!
//! The pipeline only talks to two traits, [`CompletionCapability`] and
//! [`LookupCapability`]. Set them on the config to bypass the LLM provider
//! and openFDA entirely (tests do exactly that).
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rxscan` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! ```toml
//! rxscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod agent;
pub mod analyze;
pub mod capability;
pub mod config;
pub mod drug_info;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use agent::DrugInfoAgent;
pub use analyze::{analyze, analyze_bytes, analyze_path, analyze_sync, analyze_to_file};
pub use capability::{CompletionCapability, CompletionRequest, LookupCapability, ProviderCompleter};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, EnrichmentPolicy};
pub use drug_info::{DrugInfoTool, OpenFdaClient};
pub use error::{AnalyzerError, ExtractionIssue};
pub use output::{AnalysisOutput, AnalysisStats};
pub use pipeline::encode::{encode_image, EncodedImage};
pub use pipeline::normalize::normalize;
pub use pipeline::report::render_report;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{EnrichmentResult, MedicationEntry, PrescriptionRecord};
pub use stream::{enrichment_stream, InsightStream};
