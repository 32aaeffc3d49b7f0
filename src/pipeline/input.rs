//! Input resolution: turn a user-supplied path or URL into a decoded image.
//!
//! This is the "upload" half of the presentation shell. URLs are fetched into
//! memory with `reqwest`; local files are read directly. The bytes are then
//! sniffed and decoded by the `image` crate, so a text file or a truncated
//! download fails here with a clear message instead of deep in the encoder.

use crate::error::AnalyzerError;
use image::DynamicImage;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a decoded image.
///
/// If the input is a URL, download it; otherwise read it from disk.
pub async fn load_image(input: &str, timeout_secs: u64) -> Result<DynamicImage, AnalyzerError> {
    if input.trim().is_empty() {
        return Err(AnalyzerError::InvalidInput {
            input: input.to_string(),
        });
    }
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    decode_image(&bytes, input)
}

/// Decode in-memory bytes, guessing the format from their magic number.
pub fn decode_image(bytes: &[u8], source_name: &str) -> Result<DynamicImage, AnalyzerError> {
    let img = image::load_from_memory(bytes).map_err(|e| AnalyzerError::NotAnImage {
        source_name: source_name.to_string(),
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded {}: {}x{} {:?}",
        source_name,
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, AnalyzerError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(AnalyzerError::PermissionDenied { path })
        }
        Err(_) => Err(AnalyzerError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, AnalyzerError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnalyzerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyzerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
