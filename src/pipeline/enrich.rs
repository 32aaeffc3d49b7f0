//! Enrichment: look up each extracted medication, strictly in order.
//!
//! One lookup at a time, in prescription order. Entries without a name are
//! skipped silently. What a failed lookup does depends on
//! [`EnrichmentPolicy`]: `FailFast` stops the loop and returns the error,
//! `Continue` records the failure as that medication's info text.
//!
//! Names are looked up by [`MedicationEntry::lookup_key`], without the
//! `(?)` uncertainty marker; results keep the name as read.

use crate::capability::LookupCapability;
use crate::config::{AnalyzerConfig, EnrichmentPolicy};
use crate::error::AnalyzerError;
use crate::prompts::lookup_instruction;
use crate::record::{EnrichmentResult, MedicationEntry, PrescriptionRecord};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Prefix of the info text recorded for a failed lookup under
/// [`EnrichmentPolicy::Continue`].
pub const LOOKUP_FAILED_PREFIX: &str = "Lookup failed: ";

/// Enrich every named medication in `record`.
///
/// # Errors
/// Under [`EnrichmentPolicy::FailFast`], the first
/// [`AnalyzerError::LookupUnavailable`]; the medications after it are not
/// attempted.
pub async fn enrich(
    record: &PrescriptionRecord,
    lookup: &dyn LookupCapability,
    config: &AnalyzerConfig,
) -> Result<Vec<EnrichmentResult>, AnalyzerError> {
    enrich_counted(record, lookup, config)
        .await
        .map(|(results, _failed)| results)
}

/// [`enrich`], also returning how many lookups failed and were recorded
/// under [`EnrichmentPolicy::Continue`].
pub(crate) async fn enrich_counted(
    record: &PrescriptionRecord,
    lookup: &dyn LookupCapability,
    config: &AnalyzerConfig,
) -> Result<(Vec<EnrichmentResult>, usize), AnalyzerError> {
    let total = record.medications.len();
    let mut results = Vec::with_capacity(total);
    let mut failed = 0;

    for (i, med) in record.medications.iter().enumerate() {
        match enrich_one(i + 1, total, med, lookup, config).await {
            Step::Skipped => {}
            Step::Enriched(result) => results.push(result),
            Step::Failed(result) => {
                failed += 1;
                results.push(result);
            }
            Step::Abort(e) => return Err(e),
        }
    }

    info!("Enriched {}/{} medications", results.len() - failed, total);
    Ok((results, failed))
}

/// Outcome of one medication entry.
pub(crate) enum Step {
    /// No usable name.
    Skipped,
    Enriched(EnrichmentResult),
    /// Lookup failed and was recorded under `Continue`.
    Failed(EnrichmentResult),
    /// Lookup failed under `FailFast`.
    Abort(AnalyzerError),
}

/// Process the entry at 1-based `index`, firing its progress events.
pub(crate) async fn enrich_one(
    index: usize,
    total: usize,
    med: &MedicationEntry,
    lookup: &dyn LookupCapability,
    config: &AnalyzerConfig,
) -> Step {
    if !med.has_name() {
        debug!("Medication {}/{}: no name, skipping", index, total);
        if let Some(ref cb) = config.progress_callback {
            cb.on_medication_skipped(index, total);
        }
        return Step::Skipped;
    }

    // The display name keeps any "(?)" marker; the lookup key does not.
    let name = med.name.trim();
    if let Some(ref cb) = config.progress_callback {
        cb.on_medication_start(index, total, name);
    }

    match lookup_one(lookup, med.lookup_key(), config).await {
        Ok(info) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_medication_complete(index, total, name);
            }
            Step::Enriched(EnrichmentResult {
                medication: name.to_string(),
                info,
            })
        }
        Err(e) => {
            warn!("Medication {}/{} ({}): {}", index, total, name, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_medication_error(index, total, name, &e.to_string());
            }
            match config.enrichment_policy {
                EnrichmentPolicy::FailFast => Step::Abort(e),
                EnrichmentPolicy::Continue => Step::Failed(failure_result(name, &e)),
            }
        }
    }
}

/// Run one bounded lookup. Any failure, including a timeout, comes back as
/// [`AnalyzerError::LookupUnavailable`].
pub(crate) async fn lookup_one(
    lookup: &dyn LookupCapability,
    name: &str,
    config: &AnalyzerConfig,
) -> Result<String, AnalyzerError> {
    let instruction = lookup_instruction(name);
    let limit = Duration::from_secs(config.lookup_timeout_secs);

    match timeout(limit, lookup.lookup(name, &instruction)).await {
        Ok(Ok(info)) => Ok(info),
        Ok(Err(e @ AnalyzerError::LookupUnavailable { .. })) => Err(e),
        Ok(Err(other)) => Err(AnalyzerError::LookupUnavailable {
            medication: name.to_string(),
            reason: other.to_string(),
        }),
        Err(_) => Err(AnalyzerError::LookupUnavailable {
            medication: name.to_string(),
            reason: format!("timed out after {}s", config.lookup_timeout_secs),
        }),
    }
}

pub(crate) fn failure_result(name: &str, error: &AnalyzerError) -> EnrichmentResult {
    let reason = match error {
        AnalyzerError::LookupUnavailable { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    EnrichmentResult {
        medication: name.to_string(),
        info: format!("{LOOKUP_FAILED_PREFIX}{reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers `info for <name>`; fails for names in `failing`.
    #[derive(Default)]
    struct FakeLookup {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LookupCapability for FakeLookup {
        async fn lookup(
            &self,
            medication: &str,
            instruction: &str,
        ) -> Result<String, AnalyzerError> {
            self.calls.lock().unwrap().push(instruction.to_string());
            if self.failing.iter().any(|f| *f == medication) {
                return Err(AnalyzerError::Internal("HTTP 500".into()));
            }
            Ok(format!("info for {medication}"))
        }
    }

    fn record(names: &[&str]) -> PrescriptionRecord {
        PrescriptionRecord {
            medications: names.iter().map(|n| MedicationEntry::new(*n)).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skips_empty_names_and_keeps_order() {
        let lookup = FakeLookup::default();
        let results = enrich(
            &record(&["Aspirin", "", "Metformin"]),
            &lookup,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].medication, "Aspirin");
        assert_eq!(results[0].info, "info for Aspirin");
        assert_eq!(results[1].medication, "Metformin");
        assert_eq!(
            *lookup.calls.lock().unwrap(),
            vec!["Fetch info for Aspirin", "Fetch info for Metformin"]
        );
    }

    #[tokio::test]
    async fn empty_record_yields_no_results() {
        let lookup = FakeLookup::default();
        let results = enrich(
            &PrescriptionRecord::from_error("no JSON"),
            &lookup,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();
        assert!(results.is_empty());
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fail_fast_aborts_remaining() {
        let lookup = FakeLookup {
            failing: vec!["Warfarin"],
            ..Default::default()
        };
        let err = enrich(
            &record(&["Aspirin", "Warfarin", "Metformin"]),
            &lookup,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap_err();

        match err {
            AnalyzerError::LookupUnavailable { medication, reason } => {
                assert_eq!(medication, "Warfarin");
                assert!(reason.contains("HTTP 500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Metformin was never attempted.
        assert_eq!(lookup.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn continue_records_failure_marker() {
        let lookup = FakeLookup {
            failing: vec!["Warfarin"],
            ..Default::default()
        };
        let config = AnalyzerConfig::builder()
            .enrichment_policy(EnrichmentPolicy::Continue)
            .build()
            .unwrap();
        let results = enrich(&record(&["Aspirin", "Warfarin", "Metformin"]), &lookup, &config)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].medication, "Warfarin");
        assert!(results[1].info.starts_with(LOOKUP_FAILED_PREFIX));
        assert!(results[1].info.contains("HTTP 500"));
        assert_eq!(results[2].info, "info for Metformin");
    }

    #[tokio::test]
    async fn uncertain_name_is_looked_up_without_marker() {
        let lookup = FakeLookup::default();
        let results = enrich(
            &record(&["Amoxil (?)"]),
            &lookup,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(*lookup.calls.lock().unwrap(), vec!["Fetch info for Amoxil"]);
        assert_eq!(results[0].medication, "Amoxil (?)");
        assert_eq!(results[0].info, "info for Amoxil");
    }

    #[tokio::test]
    async fn counts_failures_without_reading_info_text() {
        /// Succeeds with text that looks like a failure marker.
        struct Lookalike;

        #[async_trait]
        impl LookupCapability for Lookalike {
            async fn lookup(&self, m: &str, _i: &str) -> Result<String, AnalyzerError> {
                if m == "Warfarin" {
                    Err(AnalyzerError::Internal("HTTP 500".into()))
                } else {
                    Ok(format!("{LOOKUP_FAILED_PREFIX}none, {m} label found"))
                }
            }
        }

        let config = AnalyzerConfig::builder()
            .enrichment_policy(EnrichmentPolicy::Continue)
            .build()
            .unwrap();
        let (results, failed) =
            enrich_counted(&record(&["Aspirin", "Warfarin"]), &Lookalike, &config)
                .await
                .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(failed, 1);
    }

    struct Hang;

    #[async_trait]
    impl LookupCapability for Hang {
        async fn lookup(&self, _m: &str, _i: &str) -> Result<String, AnalyzerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn timeout_is_lookup_unavailable() {
        let config = AnalyzerConfig::builder()
            .lookup_timeout_secs(1)
            .build()
            .unwrap();
        let err = enrich(&record(&["Aspirin"]), &Hang, &config)
            .await
            .unwrap_err();
        match err {
            AnalyzerError::LookupUnavailable { reason, .. } => {
                assert!(reason.contains("timed out"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
