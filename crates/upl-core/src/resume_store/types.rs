//! Types used by the resume store.

use sha2::{Digest, Sha256};

use crate::catalog::FileRecord;

/// Progress loaded for one file. The default (0, 0) means "start from zero".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeState {
    pub uploaded_bytes: u64,
    pub chunk_size: u64,
}

/// Row view used by the CLI `status` command.
#[derive(Debug, Clone)]
pub struct ResumeRecord {
    pub file_path: String,
    pub file_size: u64,
    pub uploaded_bytes: u64,
    pub chunk_size: u64,
    /// Unix seconds of the last write.
    pub updated_at: i64,
}

/// Stable key for a file's resume identity: SHA-256 hex of `path:size:mtime_ns`.
pub fn resume_identity(record: &FileRecord) -> String {
    let raw = format!(
        "{}:{}:{}",
        record.path.display(),
        record.size,
        record.modified_nanos()
    );
    hex::encode(Sha256::digest(raw.as_bytes()))
}
