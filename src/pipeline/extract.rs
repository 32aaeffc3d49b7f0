//! Extraction request: send the prescription image to the vision model.
//!
//! Deliberately thin. Prompt wording lives in [`crate::prompts`], recovery
//! from messy answers lives in [`super::normalize`]. This stage only builds
//! the request, bounds it with a timeout, and hands back the raw text.
//!
//! There is no retry: an unreachable or failing endpoint is surfaced to the
//! caller as [`AnalyzerError::CompletionUnavailable`] straight away.

use crate::capability::{CompletionCapability, CompletionRequest};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::encode::EncodedImage;
use crate::prompts::EXTRACTION_PROMPT;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Ask the completion capability to extract the prescription as JSON.
///
/// Returns the completion text with surrounding whitespace trimmed.
pub async fn request_extraction(
    completion: &dyn CompletionCapability,
    image: &EncodedImage,
    config: &AnalyzerConfig,
) -> Result<String, AnalyzerError> {
    let start = Instant::now();
    let prompt = config
        .extraction_prompt
        .as_deref()
        .unwrap_or(EXTRACTION_PROMPT);

    let request = CompletionRequest::new(prompt).with_image(image.clone());
    let limit = Duration::from_secs(config.api_timeout_secs);

    let raw = match timeout(limit, completion.complete(request)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("Extraction request failed: {}", e);
            return Err(match e {
                AnalyzerError::CompletionUnavailable { .. } => e,
                other => AnalyzerError::CompletionUnavailable {
                    reason: other.to_string(),
                },
            });
        }
        Err(_) => {
            warn!("Extraction request timed out after {}s", config.api_timeout_secs);
            return Err(AnalyzerError::CompletionUnavailable {
                reason: format!("timed out after {}s", config.api_timeout_secs),
            });
        }
    };

    debug!(
        "Extraction completion: {} chars in {:?}",
        raw.len(),
        start.elapsed()
    );
    Ok(raw.trim().to_string())
}
