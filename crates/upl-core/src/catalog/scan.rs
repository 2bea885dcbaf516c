use std::fs;
use std::io;
use std::path::Path;

use super::record::{extension_of, FileRecord};
use super::rules::{FilterRules, Rejection};

/// Applies [`FilterRules`] to single files and directory trees.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: FilterRules,
}

impl Validator {
    pub fn new(rules: FilterRules) -> Self {
        Self { rules }
    }

    /// Check an explicitly named file. Patterns are matched against the path as given.
    pub fn validate(&self, path: &Path) -> Result<(), Rejection> {
        self.validate_as(path, &path.to_string_lossy()).map(|_| ())
    }

    /// Validate a named file and build its record (relative path = file name).
    pub fn record_for(&self, path: &Path) -> Result<FileRecord, Rejection> {
        self.validate(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        FileRecord::from_path(path, base).map_err(|e| Rejection::Unreadable(e.to_string()))
    }

    /// Existence, regular-file, readability, then the configured rules.
    /// Returns the file size on success.
    fn validate_as(&self, path: &Path, match_path: &str) -> Result<u64, Rejection> {
        let meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Rejection::Missing),
            Err(e) => return Err(Rejection::Unreadable(e.to_string())),
        };
        if !meta.is_file() {
            return Err(Rejection::NotRegularFile);
        }
        if let Err(e) = fs::File::open(path) {
            return Err(Rejection::Unreadable(e.to_string()));
        }
        self.rules
            .check(meta.len(), &extension_of(path), match_path)?;
        Ok(meta.len())
    }

    /// Depth-first walk of `root`. Files directly under `root` are at depth 0;
    /// directories deeper than `max_depth` are skipped. Files failing a filter
    /// and unreadable directories are omitted without error. Entries are
    /// visited in file-name order so the catalog is deterministic.
    pub fn scan(&self, root: &Path, max_depth: usize) -> Vec<FileRecord> {
        let mut out = Vec::new();
        self.scan_dir(root, root, 0, max_depth, &mut out);
        tracing::debug!(root = %root.display(), files = out.len(), "scan complete");
        out
    }

    fn scan_dir(
        &self,
        root: &Path,
        dir: &Path,
        depth: usize,
        max_depth: usize,
        out: &mut Vec<FileRecord>,
    ) {
        if depth > max_depth {
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() == io::ErrorKind::PermissionDenied {
                    tracing::debug!("access denied reading directory {}: {}", dir.display(), err);
                } else {
                    tracing::warn!("cannot read directory {}: {}", dir.display(), err);
                }
                return;
            }
        };

        let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.scan_dir(root, &path, depth + 1, max_depth, out);
            } else if path.is_file() {
                let rel = path.strip_prefix(root).unwrap_or(&path);
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if let Err(reason) = self.validate_as(&path, &rel_str) {
                    tracing::trace!("skip {}: {}", rel_str, reason);
                    continue;
                }
                match FileRecord::from_path(&path, root) {
                    Ok(rec) => out.push(rec),
                    Err(e) => tracing::debug!("skip {}: {}", path.display(), e),
                }
            }
        }
    }
}
