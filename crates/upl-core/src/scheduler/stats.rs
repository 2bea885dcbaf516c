//! Aggregate counters for one scheduler run.

use std::time::{Duration, Instant};

use super::progress::RunProgress;
use crate::catalog::FileRecord;
use crate::session::UploadOutcome;

/// Owned by the scheduler's completion loop; nothing else mutates it.
///
/// After a run, `uploaded_files + failed_files == total_files`.
#[derive(Debug, Clone)]
pub struct UploadStatistics {
    pub total_files: usize,
    pub uploaded_files: usize,
    pub failed_files: usize,
    pub total_bytes: u64,
    /// Sum of sizes of files that uploaded successfully.
    pub uploaded_bytes: u64,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

impl UploadStatistics {
    /// Start counting a run over `records`.
    pub fn start(records: &[FileRecord]) -> Self {
        Self {
            total_files: records.len(),
            uploaded_files: 0,
            failed_files: 0,
            total_bytes: records.iter().map(|r| r.size).sum(),
            uploaded_bytes: 0,
            started_at: Instant::now(),
            finished_at: None,
        }
    }

    pub(crate) fn record(&mut self, outcome: &UploadOutcome) {
        if outcome.succeeded() {
            self.uploaded_files += 1;
            self.uploaded_bytes += outcome.record.size;
        } else {
            self.failed_files += 1;
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_files += 1;
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    /// Uploaded files as a percentage of all files (0 for an empty run).
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.uploaded_files as f64 * 100.0 / self.total_files as f64
    }

    /// Wall time of the run so far, or of the whole run once finished.
    pub fn duration(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }

    /// Uploaded bytes per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.uploaded_bytes as f64 / secs
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_files == 0 && self.uploaded_files == self.total_files
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress {
            files_done: self.uploaded_files + self.failed_files,
            total_files: self.total_files,
            bytes_done: self.uploaded_bytes,
            total_bytes: self.total_bytes,
            elapsed_secs: self.duration().as_secs_f64(),
        }
    }
}
