//! Content digests for catalog entries.
//!
//! The digest is advisory (reported to the user, not used for resume
//! identity), so a read failure degrades to an empty string.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Like [`sha256_path`] but returns an empty string if the file cannot be read.
pub fn digest_or_empty(path: &Path) -> String {
    match sha256_path(path) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("digest failed for {}: {:#}", path.display(), e);
            String::new()
        }
    }
}
