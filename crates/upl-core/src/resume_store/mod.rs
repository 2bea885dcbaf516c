//! Persistent resume state (SQLite via sqlx).
//!
//! One row per file identity holding the last acknowledged byte offset of a
//! chunked upload. A row is removed when the upload completes, when the file
//! is found to have changed, or by the age-based purge.

mod db;
mod records;
mod types;

pub use db::ResumeStore;
pub use types::{resume_identity, ResumeRecord, ResumeState};

#[cfg(test)]
pub(crate) use db::open_memory;
