//! Upload catalog: filesystem discovery and per-file validation.
//!
//! Walks a subtree depth-first (bounded depth), applies the configured
//! size / extension / glob rules in a fixed order, and produces an ordered
//! list of [`FileRecord`]s for the scheduler.

mod record;
mod rules;
mod scan;

pub use record::FileRecord;
pub use rules::{FilterRules, Rejection};
pub use scan::Validator;

use std::collections::HashSet;

/// Drop records whose canonical path was already seen, keeping the first.
///
/// A file named on the command line and also found by a directory scan (or
/// reached twice through a symlink) must map to one session and one resume
/// record. Returns the number of records removed.
pub fn dedup_records(records: &mut Vec<FileRecord>) -> usize {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    records.retain(|r| seen.insert(r.path.clone()));
    before - records.len()
}
