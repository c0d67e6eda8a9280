//! Progress-callback trait for per-slide run events.
//!
//! Inject an [`Arc<dyn DeckProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each slide. A run spends most of its
//! time waiting (on the submission pacer and on the avatar job), so besides
//! start/complete the callback also hears about throttling and job status.
//!
//! # Example
//!
//! ```rust
//! use avatar_deck::{DeckProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl DeckProgressCallback for CountingCallback {
//!     fn on_slide_complete(&self, slide: usize, total: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("Slide {}/{} done ({} so far)", slide, total, done);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn DeckProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

/// Called by the pipelines as they process each slide or section.
///
/// Slides are processed one at a time, so events for a run arrive in order
/// from a single task. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once before the first slide, with the number of slides
    /// (or sections) that will be attempted.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when work on a slide begins.
    ///
    /// # Arguments
    /// * `slide` — 1-indexed slide number
    /// * `total` — slides in this run
    /// * `label` — slide title or section heading, when known
    fn on_slide_start(&self, slide: usize, total: usize, label: &str) {
        let _ = (slide, total, label);
    }

    /// Called before the pacer holds back a job submission.
    fn on_throttle(&self, slide: usize, wait: Duration) {
        let _ = (slide, wait);
    }

    /// Called on every job status observed while polling.
    ///
    /// # Arguments
    /// * `status`  — status string reported by the service
    /// * `elapsed` — time since polling started for this job
    fn on_job_status(&self, slide: usize, status: &str, elapsed: Duration) {
        let _ = (slide, status, elapsed);
    }

    /// Called when a slide received all of its generated content.
    fn on_slide_complete(&self, slide: usize, total: usize) {
        let _ = (slide, total);
    }

    /// Called when a slide is skipped (e.g. its notes are empty).
    fn on_slide_skipped(&self, slide: usize, total: usize, reason: &str) {
        let _ = (slide, total, reason);
    }

    /// Called when a slide fails; the run moves on to the next one.
    fn on_slide_error(&self, slide: usize, total: usize, error: &str) {
        let _ = (slide, total, error);
    }

    /// Called once after every slide has been attempted.
    ///
    /// # Arguments
    /// * `total`         — slides in this run
    /// * `success_count` — slides that completed without error
    fn on_run_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        skipped: AtomicUsize,
        errors: AtomicUsize,
        statuses: Mutex<Vec<String>>,
        completed_total: AtomicUsize,
    }

    impl DeckProgressCallback for TrackingCallback {
        fn on_slide_start(&self, _slide: usize, _total: usize, _label: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_status(&self, _slide: usize, status: &str, _elapsed: Duration) {
            self.statuses.lock().unwrap().push(status.to_string());
        }

        fn on_slide_complete(&self, _slide: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_skipped(&self, _slide: usize, _total: usize, _reason: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_error(&self, _slide: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_slide_start(1, 3, "Intro");
        cb.on_throttle(1, Duration::from_secs(35));
        cb.on_job_status(1, "Running", Duration::from_secs(5));
        cb.on_slide_complete(1, 3);
        cb.on_slide_skipped(2, 3, "empty notes");
        cb.on_slide_error(3, 3, "job failed");
        cb.on_run_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_slide_start(1, 3, "One");
        tracker.on_job_status(1, "NotStarted", Duration::ZERO);
        tracker.on_job_status(1, "Succeeded", Duration::from_secs(10));
        tracker.on_slide_complete(1, 3);
        tracker.on_slide_skipped(2, 3, "empty notes");
        tracker.on_slide_start(3, 3, "Three");
        tracker.on_slide_error(3, 3, "avatar job timed out");
        tracker.on_run_complete(3, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.statuses.lock().unwrap(),
            vec!["NotStarted".to_string(), "Succeeded".to_string()]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_slide_start(1, 10, "");
        cb.on_slide_complete(1, 10);
    }
}
