//! Streaming enrichment API: emit insights as each lookup completes.
//!
//! [`crate::pipeline::enrich::enrich`] returns only after every medication is
//! done. [`enrichment_stream`] yields each [`EnrichmentResult`] as soon as
//! its lookup finishes, so a host UI can fill the insights panel line by
//! line. Lookups still run one at a time and in prescription order.
//!
//! Under [`crate::EnrichmentPolicy::FailFast`] the stream yields the first error
//! and then ends. Under [`crate::EnrichmentPolicy::Continue`] failures arrive as
//! `Ok` items carrying the `Lookup failed:` marker, like the eager API.

use crate::capability::LookupCapability;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::enrich::{enrich_one, Step};
use crate::record::{EnrichmentResult, MedicationEntry, PrescriptionRecord};
use futures::stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of enrichment results.
pub type InsightStream =
    Pin<Box<dyn Stream<Item = Result<EnrichmentResult, AnalyzerError>> + Send>>;

struct StreamState {
    medications: Vec<MedicationEntry>,
    next: usize,
    aborted: bool,
    lookup: Arc<dyn LookupCapability>,
    config: AnalyzerConfig,
}

/// Look up the named medications of `record`, streaming results in order.
///
/// Fires the same progress events as [`crate::pipeline::enrich::enrich`].
pub fn enrichment_stream(
    record: &PrescriptionRecord,
    lookup: Arc<dyn LookupCapability>,
    config: &AnalyzerConfig,
) -> InsightStream {
    info!(
        "Streaming enrichment for {} medications",
        record.named_medications().count()
    );

    let state = StreamState {
        medications: record.medications.clone(),
        next: 0,
        aborted: false,
        lookup,
        config: config.clone(),
    };

    // Each poll runs at most one lookup, and nothing runs once aborted.
    let s = stream::unfold(state, |mut st| async move {
        let total = st.medications.len();
        while !st.aborted && st.next < total {
            let index = st.next;
            st.next += 1;
            let step = enrich_one(
                index + 1,
                total,
                &st.medications[index],
                st.lookup.as_ref(),
                &st.config,
            )
            .await;
            match step {
                Step::Skipped => continue,
                Step::Enriched(result) | Step::Failed(result) => return Some((Ok(result), st)),
                Step::Abort(e) => {
                    st.aborted = true;
                    return Some((Err(e), st));
                }
            }
        }
        None
    });

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnrichmentPolicy;
    use crate::progress::AnalysisProgressCallback;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Fails for one name and records every lookup it is asked for.
    struct FailOn {
        failing: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl FailOn {
        fn new(failing: &'static str) -> Arc<Self> {
            Arc::new(Self {
                failing,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LookupCapability for FailOn {
        async fn lookup(
            &self,
            medication: &str,
            _instruction: &str,
        ) -> Result<String, AnalyzerError> {
            self.calls.lock().unwrap().push(medication.to_string());
            if medication == self.failing {
                Err(AnalyzerError::Internal("boom".into()))
            } else {
                Ok(format!("ok {medication}"))
            }
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl AnalysisProgressCallback for Events {
        fn on_medication_start(&self, index: usize, total: usize, medication: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("start {index}/{total} {medication}"));
        }
        fn on_medication_complete(&self, index: usize, _total: usize, _medication: &str) {
            self.0.lock().unwrap().push(format!("ok {index}"));
        }
        fn on_medication_error(&self, index: usize, _total: usize, _m: &str, _e: &str) {
            self.0.lock().unwrap().push(format!("err {index}"));
        }
        fn on_medication_skipped(&self, index: usize, _total: usize) {
            self.0.lock().unwrap().push(format!("skip {index}"));
        }
    }

    fn record() -> PrescriptionRecord {
        PrescriptionRecord {
            medications: ["Aspirin", "", "Warfarin", "Metformin"]
                .into_iter()
                .map(MedicationEntry::new)
                .collect(),
            ..Default::default()
        }
    }

    async fn collect(
        lookup: Arc<FailOn>,
        config: &AnalyzerConfig,
    ) -> Vec<Result<EnrichmentResult, AnalyzerError>> {
        enrichment_stream(&record(), lookup, config).collect().await
    }

    #[tokio::test]
    async fn yields_in_order_and_skips_blank() {
        let items = collect(FailOn::new("none"), &AnalyzerConfig::default()).await;
        let names: Vec<String> = items
            .into_iter()
            .map(|r| r.unwrap().medication)
            .collect();
        assert_eq!(names, vec!["Aspirin", "Warfarin", "Metformin"]);
    }

    #[tokio::test]
    async fn fail_fast_ends_after_first_error() {
        let lookup = FailOn::new("Warfarin");
        let items = collect(Arc::clone(&lookup), &AnalyzerConfig::default()).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(AnalyzerError::LookupUnavailable { .. })
        ));
        // Metformin is never attempted.
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["Aspirin", "Warfarin"]);
    }

    #[tokio::test]
    async fn continue_keeps_going() {
        let config = AnalyzerConfig::builder()
            .enrichment_policy(EnrichmentPolicy::Continue)
            .build()
            .unwrap();
        let items = collect(FailOn::new("Warfarin"), &config).await;
        assert_eq!(items.len(), 3);
        let warfarin = items[1].as_ref().unwrap();
        assert!(warfarin.info.starts_with("Lookup failed: "));
        assert_eq!(items[2].as_ref().unwrap().info, "ok Metformin");
    }

    #[tokio::test]
    async fn fires_progress_events_like_enrich() {
        let events = Arc::new(Events::default());
        let config = AnalyzerConfig::builder()
            .progress_callback(Arc::clone(&events) as Arc<dyn AnalysisProgressCallback>)
            .build()
            .unwrap();
        let _ = collect(FailOn::new("Warfarin"), &config).await;
        assert_eq!(
            *events.0.lock().unwrap(),
            vec![
                "start 1/4 Aspirin",
                "ok 1",
                "skip 2",
                "start 3/4 Warfarin",
                "err 3",
            ]
        );
    }

    #[tokio::test]
    async fn uncertain_name_streams_with_marker_but_looks_up_without() {
        let lookup = FailOn::new("none");
        let record = PrescriptionRecord {
            medications: vec![MedicationEntry::new("Amoxil (?)")],
            ..Default::default()
        };
        let config = AnalyzerConfig::default();
        let items: Vec<_> = enrichment_stream(&record, Arc::clone(&lookup) as Arc<dyn LookupCapability>, &config)
            .collect()
            .await;
        assert_eq!(items[0].as_ref().unwrap().medication, "Amoxil (?)");
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["Amoxil"]);
    }
}
