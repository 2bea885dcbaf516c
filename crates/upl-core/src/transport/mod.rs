//! HTTP transport for encoded upload requests.
//!
//! [`Transport`] is the seam between sessions and the network: the real
//! implementation is [`CurlTransport`]; tests substitute scripted fakes.

mod curl_transport;
mod response;

pub use curl_transport::{CurlTransport, TransportOptions};
pub use response::{parse_response, ServerReply};

use crate::encoder::EncodedForm;
use crate::error::UploadError;

/// Sends one multipart request and returns the raw response body.
///
/// Implementations are blocking; sessions call them from `spawn_blocking`.
/// Non-2xx statuses must be reported as [`UploadError::Http`].
pub trait Transport: Send + Sync {
    fn post(&self, form: &EncodedForm) -> Result<String, UploadError>;
}
