//! Per-file upload session.
//!
//! A session decides once, at entry, between a single whole-file request
//! and a chunked, resumable upload, drives that path to a terminal state,
//! and returns an [`UploadOutcome`]. Sessions never retry internally; the
//! scheduler resubmits failed files, and a resubmitted chunked upload picks
//! up from the offset persisted in the resume store.

mod chunked;
mod outcome;
mod simple;

pub use outcome::UploadOutcome;

use std::sync::Arc;

use crate::catalog::FileRecord;
use crate::control::CancelToken;
use crate::encoder::ShapeOptions;
use crate::resume_store::ResumeStore;
use crate::transport::Transport;

/// Transfer parameters derived once from the validated config.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Shared secret sent with every request.
    pub key: String,
    pub chunk_size: u64,
    pub resume_enabled: bool,
    /// Files strictly larger than this take the chunked path.
    pub resume_threshold: u64,
    pub compress: bool,
    pub compress_threshold: u64,
    pub compression_level: u32,
    /// Set only when obfuscation is enabled.
    pub obfuscation_key: Option<String>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        crate::config::UplConfig::default().transfer_settings()
    }
}

impl TransferSettings {
    /// `size <= resume_threshold` (or resume disabled) is a single request.
    pub fn strategy_for(&self, size: u64) -> Strategy {
        if self.resume_enabled && size > self.resume_threshold {
            Strategy::Chunked
        } else {
            Strategy::Simple
        }
    }

    pub fn shape_options(&self) -> ShapeOptions<'_> {
        ShapeOptions {
            compress: self.compress,
            compress_threshold: self.compress_threshold,
            compression_level: self.compression_level,
            obfuscation_key: self.obfuscation_key.as_deref(),
        }
    }
}

/// Upload path chosen at session entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Simple,
    Chunked,
}

/// Session lifecycle. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Simple,
    Chunked,
    /// A request is on the wire; for chunks, `offset` is where it starts.
    InFlight { offset: u64 },
    Done,
    Failed,
}

/// Everything a session needs besides the file itself. Shared by all
/// sessions of a run.
#[derive(Clone)]
pub struct SessionContext {
    pub transport: Arc<dyn Transport>,
    /// `None` runs chunked uploads without persistence (restart from zero).
    pub store: Option<ResumeStore>,
    pub settings: TransferSettings,
    pub cancel: CancelToken,
}

impl SessionContext {
    pub fn new(transport: Arc<dyn Transport>, store: Option<ResumeStore>, settings: TransferSettings) -> Self {
        Self {
            transport,
            store,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One attempt at uploading one file.
pub struct UploadSession<'a> {
    record: &'a FileRecord,
    ctx: &'a SessionContext,
    strategy: Strategy,
    state: SessionState,
}

impl<'a> UploadSession<'a> {
    pub fn new(record: &'a FileRecord, ctx: &'a SessionContext) -> Self {
        Self {
            record,
            ctx,
            strategy: ctx.settings.strategy_for(record.size),
            state: SessionState::Init,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(file = %self.record.relative_path, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Drive the session to `Done` or `Failed`.
    pub async fn run(&mut self) -> UploadOutcome {
        let result = if self.ctx.cancel.is_cancelled() {
            Err(crate::error::UploadError::Cancelled)
        } else {
            match self.strategy {
                Strategy::Simple => {
                    self.transition(SessionState::Simple);
                    self.run_simple().await.map(Some)
                }
                Strategy::Chunked => {
                    self.transition(SessionState::Chunked);
                    self.run_chunked().await
                }
            }
        };

        match &result {
            Ok(_) => {
                self.transition(SessionState::Done);
                tracing::info!("uploaded: {}", self.record.relative_path);
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                tracing::error!("failed to upload {}: {}", self.record.relative_path, e);
            }
        }

        UploadOutcome {
            record: self.record.clone(),
            strategy: self.strategy,
            result,
            attempts: 1,
        }
    }
}
