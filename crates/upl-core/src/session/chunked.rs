//! Chunked, resumable path.
//!
//! The offset is persisted after every acknowledged chunk and before the
//! next one is read, so an interrupted run loses at most the chunk that was
//! on the wire.

use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

use super::{SessionState, UploadSession};
use crate::encoder;
use crate::error::UploadError;
use crate::transport::{parse_response, ServerReply};

/// Read until `buf` is full or EOF. Returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl UploadSession<'_> {
    /// Offset to start from. Store failures degrade to zero.
    async fn resume_offset(&self) -> u64 {
        let Some(store) = &self.ctx.store else {
            return 0;
        };
        match store.load(self.record).await {
            Ok(state) => {
                if state.uploaded_bytes > 0 && state.chunk_size != self.ctx.settings.chunk_size {
                    tracing::debug!(
                        "resume record for {} used chunk size {}, continuing with {}",
                        self.record.relative_path,
                        state.chunk_size,
                        self.ctx.settings.chunk_size
                    );
                }
                state.uploaded_bytes.min(self.record.size)
            }
            Err(e) => {
                tracing::warn!(
                    "resume state unavailable for {}, starting from zero: {:#}",
                    self.record.relative_path,
                    e
                );
                0
            }
        }
    }

    /// Commit `uploaded` as the new resume point (or clear it once complete).
    async fn commit_offset(&self, uploaded: u64) {
        let Some(store) = &self.ctx.store else {
            return;
        };
        let res = if uploaded >= self.record.size {
            store.clear(self.record).await
        } else {
            store
                .save(self.record, uploaded, self.ctx.settings.chunk_size)
                .await
        };
        if let Err(e) = res {
            tracing::warn!(
                "could not persist resume state for {} at {}: {:#}",
                self.record.relative_path,
                uploaded,
                e
            );
        }
    }

    pub(super) async fn run_chunked(&mut self) -> Result<Option<ServerReply>, UploadError> {
        let size = self.record.size;
        let chunk_size = self.ctx.settings.chunk_size.max(1);

        let mut uploaded = self.resume_offset().await;
        if uploaded > 0 {
            tracing::info!(
                "resuming upload of {} from {} bytes",
                self.record.relative_path,
                uploaded
            );
        }

        let mut file = tokio::fs::File::open(&self.record.path).await?;
        file.seek(SeekFrom::Start(uploaded)).await?;

        let file_name = self.record.file_name();
        let mut buf = vec![0u8; chunk_size.min(size.max(1)) as usize];
        let mut last_reply = None;

        while uploaded < size {
            if self.ctx.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let want = (size - uploaded).min(buf.len() as u64) as usize;
            let n = read_full(&mut file, &mut buf[..want]).await?;
            if n == 0 {
                break;
            }

            self.transition(SessionState::InFlight { offset: uploaded });
            let transport = Arc::clone(&self.ctx.transport);
            let key = self.ctx.settings.key.clone();
            let subdir = self.record.subdirectory.clone();
            let name = file_name.clone();
            let offset = uploaded;
            let (returned, sent) = tokio::task::spawn_blocking(move || {
                let form =
                    encoder::chunk_form(&name, &buf[..n], offset, size, &key, &subdir).encode();
                let res = transport.post(&form).and_then(|body| parse_response(&body));
                (buf, res)
            })
            .await?;
            buf = returned;
            let reply = sent?;

            uploaded += n as u64;
            self.commit_offset(uploaded).await;
            tracing::debug!(
                "uploaded chunk of {}: {}/{} bytes ({:.1}%)",
                self.record.relative_path,
                uploaded,
                size,
                uploaded as f64 * 100.0 / size as f64
            );
            last_reply = Some(reply);
        }

        if uploaded < size {
            return Err(UploadError::Incomplete {
                uploaded,
                total: size,
            });
        }
        if last_reply.is_none() {
            // Fully acknowledged in an earlier run; only the record was left behind.
            self.commit_offset(uploaded).await;
        }
        Ok(last_reply)
    }
}
