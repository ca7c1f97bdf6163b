//! Retry policy for vendor calls.
//!
//! Only failures the vendor might not repeat are retried: our own call
//! timeout, an unreachable host, HTTP 429 and 5xx. Anything carrying a
//! definite answer (4xx, malformed body, signing) fails immediately.

use crate::error::ProviderError;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Whether `error` is transient.
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Timeout { .. } | ProviderError::Unreachable { .. } => true,
        ProviderError::Http {
            status_code: Some(code),
            ..
        } => *code == 429 || (500..=599).contains(code),
        ProviderError::Http {
            status_code: None, ..
        }
        | ProviderError::Signing(_) => false,
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Delay before retry number `retry` (0-based), capped at 30 s.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(retry))
            .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }

    /// The wait before retrying after `retries_done` retries failed with `error`,
    /// or `None` to give up.
    pub fn next_delay(&self, retries_done: u32, error: &ProviderError) -> Option<Duration> {
        (retries_done < self.max_retries && is_retryable(error)).then(|| self.backoff(retries_done))
    }
}
