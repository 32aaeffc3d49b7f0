//! Result types returned by the `analyze*` entry points.

use crate::record::{EnrichmentResult, PrescriptionRecord};
use serde::{Deserialize, Serialize};

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// The normalised extraction (possibly error-only).
    pub record: PrescriptionRecord,
    /// One entry per enriched medication, in prescription order.
    pub insights: Vec<EnrichmentResult>,
    /// Rendered Markdown report.
    pub report: String,
    pub stats: AnalysisStats,
}

/// Counters and timings for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Entries in `record.medications`, named or not.
    pub medications_found: usize,
    /// Lookups that returned a summary.
    pub medications_enriched: usize,
    /// Entries skipped for having no name.
    pub medications_skipped: usize,
    /// Lookups that failed and were recorded under `EnrichmentPolicy::Continue`.
    pub medications_failed: usize,
    /// Byte length of the raw extraction completion.
    pub completion_chars: usize,
    pub extraction_duration_ms: u64,
    pub enrichment_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl AnalysisOutput {
    /// True when the extraction stage could not recover a record.
    pub fn extraction_failed(&self) -> bool {
        self.record.is_error()
    }
}
