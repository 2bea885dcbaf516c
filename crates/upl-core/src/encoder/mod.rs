//! Transfer encoder: request bodies for whole-file and chunk uploads.
//!
//! Pure functions of their inputs; no file or network I/O happens here.

mod multipart;
mod payload;

pub use multipart::{new_boundary, EncodedForm, MultipartForm, Part, PartBody};
pub use payload::{
    gzip, is_precompressed, obfuscate, shape, should_compress, ShapeOptions, ShapedPayload,
    COMPRESSED_EXTENSIONS,
};

/// Form for a single-request upload of a whole (possibly shaped) file.
///
/// Fields: `file` (binary), `key`, and `subdir` when non-empty.
pub fn whole_file_form<'a>(
    file_name: &str,
    content_type: &str,
    data: &'a [u8],
    key: &str,
    subdir: &str,
) -> MultipartForm<'a> {
    let mut form = MultipartForm::new()
        .binary("file", Some(file_name), content_type, data)
        .text("key", key);
    if !subdir.is_empty() {
        form = form.text("subdir", subdir);
    }
    form
}

/// Form for one chunk of a resumable upload.
///
/// Fields: `chunk` (raw bytes), `filename`, `offset`, `total_size`, `key`,
/// and `subdir` when non-empty.
pub fn chunk_form<'a>(
    file_name: &str,
    chunk: &'a [u8],
    offset: u64,
    total_size: u64,
    key: &str,
    subdir: &str,
) -> MultipartForm<'a> {
    let mut form = MultipartForm::new()
        .binary("chunk", None, "application/octet-stream", chunk)
        .text("filename", file_name)
        .text("offset", offset.to_string())
        .text("total_size", total_size.to_string())
        .text("key", key);
    if !subdir.is_empty() {
        form = form.text("subdir", subdir);
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(form: &MultipartForm<'_>) -> Vec<String> {
        form.parts().iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn whole_file_fields() {
        let form = whole_file_form("a.txt", "text/plain", b"data", "k", "");
        assert_eq!(names(&form), vec!["file", "key"]);
        let form = whole_file_form("a.txt", "text/plain", b"data", "k", "memes/dev");
        assert_eq!(names(&form), vec!["file", "key", "subdir"]);
    }

    #[test]
    fn chunk_fields_and_decimal_offsets() {
        let form = chunk_form("big.iso", b"0123", 100, 300, "k", "isos");
        assert_eq!(
            names(&form),
            vec!["chunk", "filename", "offset", "total_size", "key", "subdir"]
        );
        let encoded = form.encode_with_boundary("B");
        let body = String::from_utf8(encoded.body).unwrap();
        assert!(body.contains("name=\"offset\"\r\n\r\n100\r\n"));
        assert!(body.contains("name=\"total_size\"\r\n\r\n300\r\n"));
        assert!(body.contains("name=\"chunk\"\r\nContent-Type: application/octet-stream\r\n\r\n0123\r\n"));
    }
}
