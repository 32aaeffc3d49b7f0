//! Response normalisation: recover a [`PrescriptionRecord`] from raw model text.
//!
//! Vision models rarely answer with bare JSON. They prepend "Here is the
//! JSON:", wrap the object in ```json fences, or append a closing remark.
//! [`normalize`] takes the span from the first `{` to the LAST `}` in the
//! text (a greedy brace-span match) and parses only that.
//!
//! ## Known limitation
//!
//! The greedy span is correct when the text holds exactly one top-level
//! object and no `}` follows it. A second object, or a stray `}` in trailing
//! commentary, widens the span past the payload and the parse fails. That
//! failure is reported in the record's `error` field like any other; the
//! span is not narrowed with a balanced-brace scan.

use crate::error::ExtractionIssue;
use crate::record::PrescriptionRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Maximum characters of raw text quoted in an error message.
pub const SNIPPET_CHARS: usize = 100;

static RE_BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Turn raw completion text into a prescription record.
///
/// Never fails: a missing or malformed JSON payload yields a record whose
/// only populated field is `error`.
pub fn normalize(raw: &str) -> PrescriptionRecord {
    match parse_record(raw) {
        Ok(record) => {
            debug!(
                "Normalised record with {} medications",
                record.medications.len()
            );
            record
        }
        Err(issue) => {
            warn!("{}", issue);
            PrescriptionRecord::from_error(issue.to_string())
        }
    }
}

/// The fallible core of [`normalize`].
pub fn parse_record(raw: &str) -> Result<PrescriptionRecord, ExtractionIssue> {
    let span = brace_span(raw).ok_or_else(|| ExtractionIssue::NoJsonObject {
        snippet: snippet(raw),
    })?;

    serde_json::from_str::<PrescriptionRecord>(span).map_err(|e| ExtractionIssue::InvalidJson {
        detail: e.to_string(),
        snippet: snippet(raw),
    })
}

/// First `{` through last `}`, if the text has such a span.
pub fn brace_span(raw: &str) -> Option<&str> {
    RE_BRACE_SPAN.find(raw).map(|m| m.as_str())
}

/// The first [`SNIPPET_CHARS`] characters of `raw`.
fn snippet(raw: &str) -> String {
    raw.chars().take(SNIPPET_CHARS).collect()
}
