//! Report rendering: record + insights → Markdown document.
//!
//! Pure and deterministic. Section order is fixed: title, disclaimer,
//! extracted details, drug insights, recommendations. The disclaimer is
//! always present, including for failed extractions.

use super::postprocess::clean_insight;
use crate::record::{EnrichmentResult, PrescriptionRecord};

pub const REPORT_TITLE: &str = "# Prescription Analysis Report";
pub const DISCLAIMER: &str = "**Disclaimer:** This is AI-generated; consult a doctor.";
pub const NO_MEDICATIONS_NOTICE: &str = "No medications found.";
pub const RECOMMENDATIONS: &str = "## Recommendations\n\n- Verify dosages.\n- Monitor for interactions.";

/// Render the full analysis report.
///
/// A missing record is rendered as an empty one.
pub fn render_report(record: Option<&PrescriptionRecord>, results: &[EnrichmentResult]) -> String {
    let empty = PrescriptionRecord::default();
    let record = record.unwrap_or(&empty);

    let mut md = String::with_capacity(1024);
    md.push_str(REPORT_TITLE);
    md.push_str("\n\n");
    md.push_str(DISCLAIMER);
    md.push_str("\n\n## Extracted Details\n\n```json\n");
    md.push_str(&pretty_record(record));
    md.push_str("\n```\n\n## Drug Insights\n\n");

    if results.is_empty() {
        md.push_str(NO_MEDICATIONS_NOTICE);
        md.push_str("\n\n");
    } else {
        for result in results {
            md.push_str(&format!("### {}\n\n", result.medication.trim()));
            let info = clean_insight(&result.info);
            if !info.is_empty() {
                md.push_str(&info);
                md.push_str("\n\n");
            }
        }
    }

    md.push_str(RECOMMENDATIONS);
    md.push('\n');
    md
}

fn pretty_record(record: &PrescriptionRecord) -> String {
    // Serialising plain strings and vectors cannot fail.
    serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".to_string())
}
