use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::checksum;

/// Catalog entry describing one candidate upload.
///
/// Resume identity is (`path`, `size`, `modified`); the digest is advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    /// SHA-256 hex of the content, empty if the file could not be read.
    pub digest: String,
    pub mime_type: String,
    /// Path below the scan root, `/`-separated.
    pub relative_path: String,
    /// Server-side target directory, set by the scheduler before dispatch.
    pub subdirectory: String,
}

impl FileRecord {
    /// Stat, hash and classify `path`. `base` is the directory `relative_path` is computed from.
    ///
    /// `path` is stored canonicalized so the resume identity does not depend
    /// on the working directory.
    pub fn from_path(path: &Path, base: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let modified = meta.modified()?;
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self {
            path: fs::canonicalize(path)?,
            size: meta.len(),
            modified,
            digest: checksum::digest_or_empty(path),
            mime_type,
            relative_path: relative_path(path, base),
            subdirectory: String::new(),
        })
    }

    /// Final path component, used as the uploaded filename.
    pub fn file_name(&self) -> String {
        match self.relative_path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Lowercase extension without the dot ("" if none).
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    /// Modification time as nanoseconds since the Unix epoch (negative before it).
    pub fn modified_nanos(&self) -> i64 {
        match self.modified.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
            Err(e) => -i64::try_from(e.duration().as_nanos()).unwrap_or(i64::MAX),
        }
    }

    /// Parent directory of `relative_path` ("" for files at the scan root).
    pub fn relative_parent(&self) -> &str {
        match self.relative_path.rfind('/') {
            Some(i) => &self.relative_path[..i],
            None => "",
        }
    }
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn relative_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_fills_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("docs");
        fs::create_dir_all(&sub).unwrap();
        let file = sub.join("Report.TXT");
        fs::write(&file, b"hello\n").unwrap();

        let rec = FileRecord::from_path(&file, dir.path()).unwrap();
        assert_eq!(rec.size, 6);
        assert_eq!(rec.relative_path, "docs/Report.TXT");
        assert_eq!(rec.relative_parent(), "docs");
        assert_eq!(rec.file_name(), "Report.TXT");
        assert_eq!(rec.extension(), "txt");
        assert_eq!(rec.mime_type, "text/plain");
        assert_eq!(
            rec.digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
        assert!(rec.subdirectory.is_empty());
        assert!(rec.modified_nanos() > 0);
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob.zzqq");
        fs::write(&file, b"x").unwrap();
        let rec = FileRecord::from_path(&file, dir.path()).unwrap();
        assert_eq!(rec.mime_type, "application/octet-stream");
        assert_eq!(rec.relative_parent(), "");
    }
}
