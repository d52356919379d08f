//! Bounded retry with linear backoff and per-attempt growing timeouts

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Result of fetching one identifier, after all attempts.
///
/// Exhaustion is an ordinary outcome, not an error: downstream turns both
/// `NotFound` and `ExhaustedRetries` into a failure marker.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<D> {
    Success(D),
    /// Upstream answered 404; remaining attempts were skipped
    NotFound,
    /// Every attempt failed transiently
    ExhaustedRetries,
}

impl<D> FetchOutcome<D> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Attempt budget and pacing for [`fetch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard ceiling on attempts per identifier
    pub max_attempts: u32,
    /// Backoff step; attempt `n` (0-based) waits `base_delay * (n - 1)`
    pub base_delay: Duration,
    /// Time limit unit; attempt `n` (0-based) gets `timeout_unit * (n + 1)`
    pub timeout_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            timeout_unit: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt `attempt` (0-based). Attempts 0 and 1 fire at once.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_sub(1)
    }

    /// Time limit for attempt `attempt` (0-based).
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.timeout_unit * (attempt + 1)
    }
}

/// Run `attempt_fn` until it succeeds, reports not-found, or the attempt
/// budget is spent.
///
/// `attempt_fn` receives the 0-based attempt number. Each call races
/// against [`RetryPolicy::timeout_for`]; a lost race counts as a transient
/// failure and only abandons that one attempt.
pub async fn fetch_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt_fn: F,
) -> FetchOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max = policy.max_attempts;
    let mut attempt = 0u32;
    while attempt < max {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let limit = policy.timeout_for(attempt);
        let result = match tokio::time::timeout(limit, attempt_fn(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(limit)),
        };

        match result {
            Ok(doc) => return FetchOutcome::Success(doc),
            Err(e) if !e.is_retryable() => {
                log::debug!("{label}: {e}, not retrying");
                return FetchOutcome::NotFound;
            }
            Err(e) => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max} failed: {e}");
            }
        }
    }
    log::debug!("{label}: giving up after {max} attempts");
    FetchOutcome::ExhaustedRetries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            timeout_unit: Duration::from_secs(30),
        }
    }

    fn transient() -> FetchError {
        FetchError::Http {
            status: Some(503),
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn backoff_linear_after_second_attempt() {
        let p = policy();
        assert_eq!(p.delay_before(0), Duration::ZERO);
        assert_eq!(p.delay_before(1), Duration::ZERO);
        assert_eq!(p.delay_before(2), Duration::from_secs(10));
        assert_eq!(p.delay_before(4), Duration::from_secs(30));
    }

    #[test]
    fn timeout_grows_with_attempt() {
        let p = policy();
        assert_eq!(p.timeout_for(0), Duration::from_secs(30));
        assert_eq!(p.timeout_for(1), Duration::from_secs(60));
        assert_eq!(p.timeout_for(4), Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();
        let outcome = fetch_with_retry("pkg", &policy(), |_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, FetchError>(7) }
        })
        .await;
        assert_eq!(outcome, FetchOutcome::Success(7));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_skips_remaining_budget() {
        let calls = Cell::new(0);
        let outcome: FetchOutcome<()> = fetch_with_retry("pkg", &policy(), |_| {
            calls.set(calls.get() + 1);
            async {
                Err(FetchError::Http {
                    status: Some(404),
                    message: "missing".to_string(),
                })
            }
        })
        .await;
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = Cell::new(0);
        let outcome = fetch_with_retry("pkg", &policy(), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 2 {
                    Err(transient())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(outcome, FetchOutcome::Success(2));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();
        let outcome: FetchOutcome<()> = fetch_with_retry("pkg", &policy(), |_| {
            calls.set(calls.get() + 1);
            async { Err(transient()) }
        })
        .await;
        assert_eq!(outcome, FetchOutcome::ExhaustedRetries);
        assert_eq!(calls.get(), 5);
        // backoff 0 + 0 + 10 + 20 + 30
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_timing_out_stops_at_ceiling() {
        let calls = Cell::new(0);
        let outcome: FetchOutcome<()> = fetch_with_retry("pkg", &policy(), |_| {
            calls.set(calls.get() + 1);
            std::future::pending()
        })
        .await;
        assert_eq!(outcome, FetchOutcome::ExhaustedRetries);
        assert_eq!(calls.get(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_never_calls() {
        let calls = Cell::new(0);
        let p = RetryPolicy {
            max_attempts: 0,
            ..policy()
        };
        let outcome: FetchOutcome<()> = fetch_with_retry("pkg", &p, |_| {
            calls.set(calls.get() + 1);
            async { Ok(()) }
        })
        .await;
        assert_eq!(outcome, FetchOutcome::ExhaustedRetries);
        assert_eq!(calls.get(), 0);
    }
}
