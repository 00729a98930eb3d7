//! Progress-callback trait for report generation events.
//!
//! Inject an [`Arc<dyn DraftProgressCallback>`] via
//! [`crate::config::DraftConfigBuilder::progress_callback`] to receive events
//! as the run moves through OCR, draft streaming and conversion. The CLI uses
//! it to drive a spinner and to echo draft chunks as they arrive.
//!
//! # Example
//!
//! ```rust
//! use report_drafter::{DraftConfig, DraftProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct Echo {
//!     text: Mutex<String>,
//! }
//!
//! impl DraftProgressCallback for Echo {
//!     fn on_draft_chunk(&self, chunk: &str) {
//!         self.text.lock().unwrap().push_str(chunk);
//!     }
//! }
//!
//! let echo = Arc::new(Echo { text: Mutex::new(String::new()) });
//! let config = DraftConfig::builder()
//!     .progress_callback(echo as Arc<dyn DraftProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Stage;
use std::sync::Arc;

/// Called by the pipeline as a run progresses.
///
/// All methods default to no-ops so callers only override what they need.
/// Implementations must be `Send + Sync`; the HTTP front end shares one
/// configuration across request tasks.
pub trait DraftProgressCallback: Send + Sync {
    /// A stage is about to start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage finished successfully.
    ///
    /// * `output_len` — byte length of what the stage produced
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// An LLM attempt failed and will be retried after `delay_ms`.
    ///
    /// * `retry` — 1-based retry number
    fn on_retry(&self, stage: Stage, retry: u32, delay_ms: u64, error: &str) {
        let _ = (stage, retry, delay_ms, error);
    }

    /// A non-empty chunk of draft text arrived from the stream.
    fn on_draft_chunk(&self, chunk: &str) {
        let _ = chunk;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DraftProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DraftConfig`].
pub type ProgressCallback = Arc<dyn DraftProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<(Stage, bool)>>,
        retries: AtomicUsize,
        chunks: Mutex<String>,
    }

    impl DraftProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.stages.lock().unwrap().push((stage, false));
        }

        fn on_stage_complete(&self, stage: Stage, _output_len: usize) {
            self.stages.lock().unwrap().push((stage, true));
        }

        fn on_retry(&self, _stage: Stage, _retry: u32, _delay_ms: u64, _error: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_draft_chunk(&self, chunk: &str) {
            self.chunks.lock().unwrap().push_str(chunk);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Ocr);
        cb.on_retry(Stage::Ocr, 1, 500, "timeout");
        cb.on_draft_chunk("text");
        cb.on_stage_complete(Stage::Convert, 10);
    }

    #[test]
    fn recorder_receives_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Draft);
        rec.on_draft_chunk("## 1. ");
        rec.on_draft_chunk("Purpose");
        rec.on_retry(Stage::Draft, 1, 500, "429");
        rec.on_stage_complete(Stage::Draft, 13);

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![(Stage::Draft, false), (Stage::Draft, true)]
        );
        assert_eq!(rec.retries.load(Ordering::SeqCst), 1);
        assert_eq!(*rec.chunks.lock().unwrap(), "## 1. Purpose");
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Ocr);
    }
}
