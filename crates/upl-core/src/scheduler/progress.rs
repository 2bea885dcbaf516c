//! Run-level progress (files and bytes done, rate, ETA).
//!
//! One snapshot is taken per completed file and handed to the observer with
//! the completion event; rate = bytes_done / elapsed_secs.

/// Snapshot of run progress after a file reached a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgress {
    /// Files that reached a terminal state (uploaded or failed).
    pub files_done: usize,
    pub total_files: usize,
    /// Bytes of successfully uploaded files.
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Seconds since the run started.
    pub elapsed_secs: f64,
}

impl RunProgress {
    /// Upload rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if no rate yet).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction of files finished, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_files == 0 {
            return 1.0;
        }
        (self.files_done as f64 / self.total_files as f64).min(1.0)
    }
}
