use rand::RngCore;

/// Content of one form part.
#[derive(Debug, Clone)]
pub enum PartBody<'a> {
    Text(String),
    Binary {
        filename: Option<String>,
        content_type: String,
        data: &'a [u8],
    },
}

/// A named multipart/form-data part.
#[derive(Debug, Clone)]
pub struct Part<'a> {
    pub name: String,
    pub body: PartBody<'a>,
}

/// Ordered list of parts; binary parts borrow their bytes until encoded.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm<'a> {
    parts: Vec<Part<'a>>,
}

/// Encoded request body plus the boundary it was built with.
#[derive(Debug, Clone)]
pub struct EncodedForm {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl EncodedForm {
    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Fresh boundary carrying 128 random bits, hex-encoded.
pub fn new_boundary() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("----uplFormBoundary{}", hex::encode(bytes))
}

/// Quote-safe form of a header parameter value (`"` and line breaks percent-encoded).
fn escape_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl<'a> MultipartForm<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            body: PartBody::Text(value.into()),
        });
        self
    }

    pub fn binary(
        mut self,
        name: &str,
        filename: Option<&str>,
        content_type: &str,
        data: &'a [u8],
    ) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            body: PartBody::Binary {
                filename: filename.map(str::to_string),
                content_type: content_type.to_string(),
                data,
            },
        });
        self
    }

    pub fn parts(&self) -> &[Part<'a>] {
        &self.parts
    }

    /// Encode with a freshly generated boundary.
    pub fn encode(&self) -> EncodedForm {
        self.encode_with_boundary(&new_boundary())
    }

    pub fn encode_with_boundary(&self, boundary: &str) -> EncodedForm {
        let payload: usize = self
            .parts
            .iter()
            .map(|p| match &p.body {
                PartBody::Text(s) => s.len(),
                PartBody::Binary { data, .. } => data.len(),
            })
            .sum();
        let mut body = Vec::with_capacity(payload + self.parts.len() * 128 + boundary.len() + 8);

        for part in &self.parts {
            body.extend_from_slice(b"--");
            body.extend_from_slice(boundary.as_bytes());
            body.extend_from_slice(b"\r\n");
            let name = escape_param(&part.name);
            match &part.body {
                PartBody::Text(value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                PartBody::Binary {
                    filename,
                    content_type,
                    data,
                } => {
                    let disposition = match filename {
                        Some(f) => format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            name,
                            escape_param(f)
                        ),
                        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
                    };
                    body.extend_from_slice(disposition.as_bytes());
                    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_bytes());
        body.extend_from_slice(b"--\r\n");

        EncodedForm {
            boundary: boundary.to_string(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_has_128_bits_of_hex_and_differs_per_call() {
        let a = new_boundary();
        let b = new_boundary();
        assert_ne!(a, b);
        let hex_part = a.trim_start_matches("----uplFormBoundary");
        assert_eq!(hex_part.len(), 32);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn encodes_exact_wire_layout() {
        let form = MultipartForm::new()
            .binary("file", Some("a.txt"), "text/plain", b"hi")
            .text("key", "k");
        let encoded = form.encode_with_boundary("XYZ");
        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            hi\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"key\"\r\n\
            \r\n\
            k\r\n\
            --XYZ--\r\n";
        assert_eq!(encoded.content_type(), "multipart/form-data; boundary=XYZ");
        assert_eq!(String::from_utf8(encoded.body).unwrap(), expected);
    }

    #[test]
    fn binary_data_is_copied_verbatim() {
        let data: Vec<u8> = (0u8..=255).collect();
        let encoded = MultipartForm::new()
            .binary("chunk", None, "application/octet-stream", &data)
            .encode();
        let needle = encoded
            .body
            .windows(data.len())
            .any(|w| w == data.as_slice());
        assert!(needle);
        assert!(encoded.body.ends_with(format!("--{}--\r\n", encoded.boundary).as_bytes()));
    }

    #[test]
    fn filename_quotes_are_escaped() {
        let encoded = MultipartForm::new()
            .binary("file", Some("we\"ird.txt"), "text/plain", b"")
            .encode_with_boundary("B");
        let body = String::from_utf8(encoded.body).unwrap();
        assert!(body.contains("filename=\"we%22ird.txt\""));
    }
}
