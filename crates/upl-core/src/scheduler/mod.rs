//! Run scheduler.
//!
//! Fans the catalog out to upload sessions under a bounded worker pool,
//! resubmits failed files per the retry policy, and aggregates statistics
//! in a single completion loop.

mod parallel;
mod progress;
mod stats;

pub use parallel::run_uploads;
pub use progress::RunProgress;
pub use stats::UploadStatistics;

use crate::catalog::FileRecord;
use crate::retry::RetryPolicy;
use crate::session::UploadOutcome;

/// Per-run scheduling parameters.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Maximum sessions with a request in flight.
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
    /// Server-side target directory for every file.
    pub subdir: String,
    /// Append each file's relative parent directory to `subdir`.
    pub preserve_structure: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            retry: RetryPolicy::default(),
            subdir: String::new(),
            preserve_structure: false,
        }
    }
}

impl ScheduleOptions {
    pub fn from_config(cfg: &crate::config::UplConfig, subdir: Option<&str>) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent,
            retry: cfg.retry.policy(),
            subdir: subdir.unwrap_or(&cfg.default_subdir).to_string(),
            preserve_structure: cfg.preserve_structure,
        }
    }
}

/// Sent to the observer once per file, after its last attempt.
#[derive(Debug, Clone)]
pub struct FileCompleted {
    pub relative_path: String,
    pub size: u64,
    pub succeeded: bool,
    pub attempts: u32,
    pub error: Option<String>,
    /// Run totals including this file.
    pub progress: RunProgress,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub stats: UploadStatistics,
    /// One outcome per file, in completion order.
    pub outcomes: Vec<UploadOutcome>,
}

/// Target directory for a file: `base`, or `base/parent` when preserving structure.
pub fn target_subdir(base: &str, relative_parent: &str, preserve_structure: bool) -> String {
    let base = base.trim_matches('/');
    if !preserve_structure || relative_parent.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        relative_parent.to_string()
    } else {
        format!("{}/{}", base, relative_parent)
    }
}

/// Set `subdirectory` on every record before dispatch.
pub fn assign_subdirectories(records: &mut [FileRecord], base: &str, preserve_structure: bool) {
    for record in records {
        record.subdirectory = target_subdir(base, record.relative_parent(), preserve_structure);
    }
}
