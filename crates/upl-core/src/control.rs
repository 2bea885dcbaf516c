//! Run cancellation: a shared flag checked by sessions between chunks.
//!
//! A chunk that is already on the wire is allowed to finish and persist its
//! offset before the session observes the flag, so a later run resumes from
//! the last acknowledged byte instead of re-sending it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap-to-clone cancellation flag shared by the scheduler and its sessions.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
