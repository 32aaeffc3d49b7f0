//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`EncodedImage`].
//!
//! Vision APIs accept images as base64 payloads embedded in the JSON request
//! body. Photos of paper prescriptions compress well as JPEG and stay far
//! below upload limits even straight off a phone camera.

use crate::error::AnalyzerError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// A transport-safe image: base64 text plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// `data:image/jpeg;base64,...` form, for prompts that embed the image inline.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Attachment form understood by the LLM client. `detail: "high"` keeps
    /// small handwriting legible to GPT-4-class tiling.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.mime_type).with_detail("high")
    }
}

/// Re-serialise an image as JPEG and base64-encode it.
///
/// Color types the JPEG encoder cannot write (float buffers, for example)
/// fail with [`AnalyzerError::Encoding`]; the image is never silently
/// converted.
pub fn encode_image(img: &DynamicImage) -> Result<EncodedImage, AnalyzerError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .map_err(|e| AnalyzerError::Encoding {
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(EncodedImage {
        data: b64,
        mime_type: JPEG_MIME,
    })
}
