use serde_json::Value;

use super::Strategy;
use crate::catalog::FileRecord;
use crate::error::UploadError;
use crate::transport::ServerReply;

/// Terminal result for one file after all of its attempts.
#[derive(Debug)]
pub struct UploadOutcome {
    pub record: FileRecord,
    pub strategy: Strategy,
    /// `Ok(None)` when a chunked upload had nothing left to send.
    pub result: Result<Option<ServerReply>, UploadError>,
    /// Attempts made, including the first.
    pub attempts: u32,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&UploadError> {
        self.result.as_ref().err()
    }

    /// Present iff the upload failed.
    pub fn error_detail(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    /// JSON the server returned for the final request, if any.
    pub fn server_response(&self) -> Option<&Value> {
        match &self.result {
            Ok(Some(reply)) => Some(&reply.raw),
            _ => None,
        }
    }
}
