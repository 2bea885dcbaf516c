//! Retry and backoff policy.
//!
//! Classifies per-file upload errors (timeouts, throttling, connection
//! failures, protocol errors) and decides whether the scheduler should
//! resubmit the file, and after which delay.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
