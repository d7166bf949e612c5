//! Retry with exponential backoff

use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff: `base * 2^attempt` (base 1s → 2s, 4s, 8s, ...)
pub fn backoff_duration(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Retry a fallible async operation with exponential backoff.
///
/// On retryable errors, logs the failure, sleeps, and retries up to
/// `max_retries` times.
///
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion / non-retryable error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    label: &str,
    max_retries: u32,
    base: Duration,
    mut attempt_fn: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::warn!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                tokio::time::sleep(backoff_duration(base, attempt)).await;
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable={})", self.0)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn backoff_exponential() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_duration(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_duration(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_duration(base, 3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_zero_base() {
        assert_eq!(backoff_duration(Duration::ZERO, 5), Duration::ZERO);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> =
            retry_with_backoff("test", 3, Duration::ZERO, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(TestError(true)) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> =
            retry_with_backoff("test", 2, Duration::ZERO, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError(true))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> =
            retry_with_backoff("test", 5, Duration::ZERO, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError(false))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
