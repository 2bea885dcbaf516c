//! Per-file transfer errors.
//!
//! Kept typed (rather than `anyhow`) so the scheduler can classify a failure
//! and decide whether another attempt is worthwhile.

use thiserror::Error;

/// Longest prefix of an unparseable response body kept in the error detail.
pub const RESPONSE_PREFIX_CAP: usize = 200;

#[derive(Debug, Error)]
pub enum UploadError {
    /// File rejected before any network attempt.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Curl reported an error (timeout, connection, etc.).
    #[error("transport: {0}")]
    Curl(#[from] curl::Error),
    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u32, body: String },
    /// Response body was not the expected JSON object.
    #[error("invalid JSON response: {0}")]
    Protocol(String),
    /// Server parsed the request and reported `success: false`.
    #[error("server rejected upload: {0}")]
    Rejected(String),
    /// Chunk loop ended short of the file size without an explicit error.
    #[error("upload incomplete: {uploaded}/{total} bytes")]
    Incomplete { uploaded: u64, total: u64 },
    /// Local read of the source file failed.
    #[error("read source: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking worker for encode/send panicked or was cancelled by the runtime.
    #[error("worker task failed: {0}")]
    Worker(String),
    /// Run was cancelled before this file finished.
    #[error("cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for UploadError {
    fn from(e: tokio::task::JoinError) -> Self {
        UploadError::Worker(e.to_string())
    }
}

/// Truncate `body` to at most [`RESPONSE_PREFIX_CAP`] bytes on a char boundary.
pub fn response_prefix(body: &str) -> &str {
    if body.len() <= RESPONSE_PREFIX_CAP {
        return body;
    }
    let mut end = RESPONSE_PREFIX_CAP;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
