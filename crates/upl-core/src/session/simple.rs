//! Whole-file path: shape once, one request, parse once.

use std::sync::Arc;

use super::{SessionState, UploadSession};
use crate::encoder::{self, shape};
use crate::error::UploadError;
use crate::transport::{parse_response, ServerReply};

impl UploadSession<'_> {
    pub(super) async fn run_simple(&mut self) -> Result<ServerReply, UploadError> {
        let data = tokio::fs::read(&self.record.path).await?;

        let transport = Arc::clone(&self.ctx.transport);
        let settings = self.ctx.settings.clone();
        let ext = self.record.extension();
        let mut file_name = self.record.file_name();
        let mime_type = self.record.mime_type.clone();
        let subdir = self.record.subdirectory.clone();

        self.transition(SessionState::InFlight { offset: 0 });
        tokio::task::spawn_blocking(move || {
            let shaped = shape(data, &ext, &settings.shape_options());
            let content_type = if shaped.compressed {
                file_name.push_str(".gz");
                "application/gzip"
            } else {
                mime_type.as_str()
            };
            let form = encoder::whole_file_form(
                &file_name,
                content_type,
                &shaped.data,
                &settings.key,
                &subdir,
            )
            .encode();
            let body = transport.post(&form)?;
            parse_response(&body)
        })
        .await?
    }
}
