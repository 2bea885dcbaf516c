//! Classify upload errors into retry policy error kinds.

use crate::error::UploadError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        _ => ErrorKind::Http(code),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Fatal
}

/// Classify an upload error into an ErrorKind.
pub fn classify(e: &UploadError) -> ErrorKind {
    match e {
        UploadError::Curl(ce) => classify_curl_error(ce),
        UploadError::Http { status, .. } => classify_http_status(*status),
        UploadError::Protocol(_) | UploadError::Rejected(_) => ErrorKind::Protocol,
        UploadError::Incomplete { .. } => ErrorKind::Incomplete,
        UploadError::Validation(_)
        | UploadError::Io(_)
        | UploadError::Worker(_)
        | UploadError::Cancelled => ErrorKind::Fatal,
    }
}
