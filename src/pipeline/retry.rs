//! Bounded exponential backoff around LLM calls.
//!
//! HTTP 429 / 5xx answers and dropped connections are common when a large
//! PDF is sent inline. Each stage gets `1 + max_retries` attempts with a
//! doubling delay between them (500 ms → 1 s → 2 s with the defaults).
//! Every error kind is retried, including authentication failures; the
//! budget is small enough that a bad key costs a few seconds at most.

use crate::config::RetryPolicy;
use crate::error::{DraftError, LlmError};
use crate::output::Stage;
use crate::progress::ProgressCallback;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run `op` until it succeeds or the policy's attempts are spent.
///
/// `op` receives the 0-based attempt number. On success returns the value
/// together with the number of retries it took.
pub async fn with_backoff<T, F, Fut>(
    stage: Stage,
    policy: &RetryPolicy,
    progress: Option<&ProgressCallback>,
    mut op: F,
) -> Result<(T, u32), DraftError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_err: Option<LlmError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_ms(attempt);
            let reason = last_err.as_ref().map(|e| e.to_string()).unwrap_or_default();
            warn!(
                "{}: retry {}/{} after {}ms",
                stage, attempt, policy.max_retries, delay
            );
            if let Some(cb) = progress {
                cb.on_retry(stage, attempt, delay, &reason);
            }
            sleep(Duration::from_millis(delay)).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) => {
                warn!("{}: attempt {} failed: {}", stage, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(DraftError::RetriesExhausted {
        stage,
        attempts: policy.attempts(),
        source: last_err.unwrap_or_else(|| LlmError::Transport("no attempt was made".into())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::DraftProgressCallback;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_ms: 1,
        }
    }

    fn flaky() -> LlmError {
        LlmError::Api {
            provider: "test".into(),
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let (v, retries) = with_backoff(Stage::Ocr, &fast(3), None, |_| async { Ok::<_, LlmError>(7) })
            .await
            .unwrap();
        assert_eq!((v, retries), (7, 0));
    }

    #[tokio::test]
    async fn succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let (v, retries) = with_backoff(Stage::Draft, &fast(2), None, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(flaky())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(v, "done");
        assert_eq!(retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_stage_and_attempts() {
        let err = with_backoff(Stage::Ocr, &fast(1), None, |_| async { Err::<(), _>(flaky()) })
            .await
            .unwrap_err();
        match err {
            DraftError::RetriesExhausted {
                stage,
                attempts,
                source,
            } => {
                assert_eq!(stage, Stage::Ocr);
                assert_eq!(attempts, 2);
                assert!(matches!(source, LlmError::Api { status: 503, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(Stage::Ocr, &fast(0), None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(flaky()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct CountRetries(AtomicU32);

    impl DraftProgressCallback for CountRetries {
        fn on_retry(&self, stage: Stage, _retry: u32, delay_ms: u64, error: &str) {
            assert_eq!(stage, Stage::Draft);
            assert!(delay_ms >= 1);
            assert!(error.contains("503"));
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn retries_are_reported_to_progress() {
        let counter = Arc::new(CountRetries::default());
        let cb: ProgressCallback = counter.clone();
        let _ = with_backoff(Stage::Draft, &fast(3), Some(&cb), |_| async {
            Err::<(), _>(flaky())
        })
        .await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }
}
