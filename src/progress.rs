//! Progress-callback trait for analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts the prescription and looks up each
//! medication. Hosts can forward them to a terminal spinner, a channel, or a
//! UI without the library knowing how the host communicates.
//!
//! # Example
//!
//! ```rust
//! use rxscan::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_medication_complete(&self, index: usize, total: usize, medication: &str) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index, total, medication);
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Medication indices are 1-based; `total` counts
/// every entry in the record, named or not.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once, before the extraction request is sent.
    fn on_analysis_start(&self) {}

    /// Called once the raw completion has been normalised.
    ///
    /// `medications` is the number of entries found; `failed` is true when
    /// the record carries only an error.
    fn on_extraction_complete(&self, medications: usize, failed: bool) {
        let _ = (medications, failed);
    }

    /// Called just before a medication lookup starts.
    fn on_medication_start(&self, index: usize, total: usize, medication: &str) {
        let _ = (index, total, medication);
    }

    /// Called when a medication lookup returns a summary.
    fn on_medication_complete(&self, index: usize, total: usize, medication: &str) {
        let _ = (index, total, medication);
    }

    /// Called when a medication lookup fails.
    fn on_medication_error(&self, index: usize, total: usize, medication: &str, error: &str) {
        let _ = (index, total, medication, error);
    }

    /// Called for entries skipped because they have no name.
    fn on_medication_skipped(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once after the report is rendered.
    fn on_analysis_complete(&self, enriched: usize, total: usize) {
        let _ = (enriched, total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        skipped: AtomicUsize,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_medication_start(&self, _index: usize, _total: usize, _medication: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_medication_complete(&self, _index: usize, _total: usize, _medication: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_medication_error(&self, _index: usize, _total: usize, _m: &str, _e: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_medication_skipped(&self, _index: usize, _total: usize) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_analysis_start();
        cb.on_extraction_complete(2, false);
        cb.on_medication_start(1, 2, "Aspirin");
        cb.on_medication_complete(1, 2, "Aspirin");
        cb.on_medication_error(2, 2, "Metformin", "timeout");
        cb.on_medication_skipped(2, 2);
        cb.on_analysis_complete(1, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_medication_start(1, 3, "Aspirin");
        tracker.on_medication_complete(1, 3, "Aspirin");
        tracker.on_medication_skipped(2, 3);
        tracker.on_medication_start(3, 3, "Metformin");
        tracker.on_medication_error(3, 3, "Metformin", "HTTP 500");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_analysis_start();
        cb.on_analysis_complete(0, 0);
    }
}
