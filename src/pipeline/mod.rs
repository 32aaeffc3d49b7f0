//! Pipeline stages for prescription analysis.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own with fake capabilities.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ extract ──▶ normalize ──▶ enrich ──▶ report
//! (path/URL) (base64)  (VLM call)  (brace span)  (lookups)  (Markdown)
//! ```
//!
//! 1. [`input`]     — decode a local file, URL, or byte buffer into an image
//! 2. [`encode`]    — JPEG-encode and base64-wrap the image
//! 3. [`extract`]   — one vision completion with the extraction prompt; the
//!    only stage that talks to the model about the image
//! 4. [`normalize`] — recover a typed record from the raw answer; never fails
//! 5. [`enrich`]    — sequential per-medication lookups
//! 6. [`report`]    — deterministic Markdown, with insight text cleaned by
//!    [`postprocess`]

pub mod encode;
pub mod enrich;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod postprocess;
pub mod report;
