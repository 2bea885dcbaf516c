//! Whole-file payload shaping: optional gzip, then optional XOR obfuscation.
//!
//! Chunked uploads never go through here; their bytes must line up with
//! resumable offsets.
//!
//! The obfuscation is a repeating-key XOR. It keeps casual inspection away
//! and nothing more: it is not encryption and gives no confidentiality or
//! integrity guarantee.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Extensions (lowercase, no dot) of formats that are already compressed.
pub const COMPRESSED_EXTENSIONS: &[&str] = &[
    "zip", "gz", "bz2", "xz", "7z", "rar", "jpg", "jpeg", "png", "gif", "mp3", "mp4", "avi",
];

/// How to shape one whole-file payload.
#[derive(Debug, Clone, Copy)]
pub struct ShapeOptions<'a> {
    pub compress: bool,
    /// Payloads at or below this many bytes are sent as-is.
    pub compress_threshold: u64,
    pub compression_level: u32,
    pub obfuscation_key: Option<&'a str>,
}

/// Bytes to send plus what was applied to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedPayload {
    pub data: Vec<u8>,
    pub compressed: bool,
    pub obfuscated: bool,
}

pub fn is_precompressed(ext: &str) -> bool {
    COMPRESSED_EXTENSIONS.contains(&ext)
}

/// True if a file with this extension and size is worth trying to gzip.
pub fn should_compress(ext: &str, size: u64, threshold: u64) -> bool {
    !is_precompressed(ext) && size > threshold
}

pub fn gzip(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level.min(9)));
    enc.write_all(data)?;
    enc.finish()
}

/// XOR `data` in place with `key` repeated. Applying it twice with the same key restores the input.
pub fn obfuscate(data: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (b, k) in data.iter_mut().zip(key.iter().cycle()) {
        *b ^= k;
    }
}

/// Compress (when enabled, eligible and actually smaller), then obfuscate (when keyed).
pub fn shape(data: Vec<u8>, ext: &str, opts: &ShapeOptions<'_>) -> ShapedPayload {
    let mut data = data;
    let mut compressed = false;

    if opts.compress && should_compress(ext, data.len() as u64, opts.compress_threshold) {
        match gzip(&data, opts.compression_level) {
            Ok(gz) if gz.len() < data.len() => {
                data = gz;
                compressed = true;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("gzip failed, sending uncompressed: {}", e),
        }
    }

    let mut obfuscated = false;
    if let Some(key) = opts.obfuscation_key.filter(|k| !k.is_empty()) {
        obfuscate(&mut data, key.as_bytes());
        obfuscated = true;
    }

    ShapedPayload {
        data,
        compressed,
        obfuscated,
    }
}
