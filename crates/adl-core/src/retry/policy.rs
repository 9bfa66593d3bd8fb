use std::time::Duration;

use crate::config::{clamped_secs, RetryConfig};

/// Backoff curve knee: at `retry_count == KNEE` the delay is half the ceiling.
const KNEE: u32 = 15;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request, connect or stall deadline elapsed.
    Timeout,
    /// Network-level failure (connection refused or reset, DNS).
    Connection,
    /// Server answered with an error status.
    Http(u32),
    /// Local I/O and anything else.
    Other,
}

impl ErrorKind {
    /// Only timeouts are retried; everything else aborts the batch.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Timeout)
    }
}

/// Decision returned by the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Not retryable; abort the batch.
    Fatal,
    /// Schedule another attempt with this retry count.
    Retry { next_retry: u32 },
    /// Retryable, but the ceiling has been reached.
    Exhausted,
}

/// Sub-linear backoff toward a ceiling, with a retry ceiling.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry count at which the batch gives up (attempts made = this value).
    pub max_retries: u32,
    /// Delay the curve approaches asymptotically.
    pub delay_ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ceiling: Duration::from_secs(60),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            delay_ceiling: clamped_secs(cfg.delay_ceiling_secs, 0.0),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `retry_count`: zero for the first attempt, then
    /// `ceiling * r / (r + 15)` (1 → 3.75s, 2 → ~7s, 6 → ~17s with a 60s ceiling).
    pub fn delay(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        self.delay_ceiling
            .mul_f64(f64::from(retry_count) / f64::from(retry_count + KNEE))
    }

    /// Decides what follows a failed attempt numbered `retry_count`.
    pub fn decide(&self, retry_count: u32, kind: ErrorKind) -> RetryDecision {
        if !kind.is_retryable() {
            return RetryDecision::Fatal;
        }
        let next_retry = retry_count.saturating_add(1);
        if next_retry >= self.max_retries {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry { next_retry }
        }
    }
}
