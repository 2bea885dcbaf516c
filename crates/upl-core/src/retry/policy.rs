use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request timed out (connect/transfer).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Any other non-2xx status.
    Http(u32),
    /// Malformed response or server-side `success: false`.
    Protocol,
    /// Chunk loop ended short; a retry resumes from the persisted offset.
    Incomplete,
    /// Not worth retrying (validation, local I/O, cancellation).
    Fatal,
}

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries (single attempt).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decide what to do after `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Fatal => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http(_)
            | ErrorKind::Protocol
            | ErrorKind::Incomplete => {
                let raw = match self.backoff {
                    Backoff::Fixed => self.base_delay,
                    Backoff::Exponential => {
                        // base * 2^(attempt-1), shift capped to keep the multiplier small.
                        let exp = 1u32 << attempt.saturating_sub(1).min(8);
                        self.base_delay.saturating_mul(exp)
                    }
                };
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}
