//! Server reply parsing: `{"success": bool, "message": string?}`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{response_prefix, UploadError};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// A successful reply; `raw` keeps the whole JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReply {
    pub message: Option<String>,
    pub raw: Value,
}

/// Parse a response body once.
///
/// Non-JSON (or non-object) bodies are [`UploadError::Protocol`] carrying at
/// most the first 200 bytes; `success: false` (or missing) is
/// [`UploadError::Rejected`] with the server's message.
pub fn parse_response(body: &str) -> Result<ServerReply, UploadError> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|_| UploadError::Protocol(response_prefix(body).to_string()))?;
    let envelope: Envelope = serde_json::from_value(raw.clone())
        .map_err(|_| UploadError::Protocol(response_prefix(body).to_string()))?;
    if !envelope.success {
        return Err(UploadError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }
    Ok(ServerReply {
        message: envelope.message,
        raw,
    })
}
