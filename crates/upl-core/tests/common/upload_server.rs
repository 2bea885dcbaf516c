//! Minimal HTTP/1.1 upload endpoint for integration tests.
//!
//! Accepts multipart POSTs in the client's wire format: whole files arrive as
//! a `file` part, chunks as `chunk` + `filename`/`offset`/`total_size`.
//! Chunks are appended only when `offset` equals the bytes already stored.
//! Replies with `{"success": bool, "message": string}`.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Required value of the `key` field.
    pub key: String,
    /// 0-based request indexes answered with `500 Internal Server Error`.
    pub fail_requests: HashSet<usize>,
    /// Reply with this raw body (status 200) instead of JSON.
    pub raw_reply: Option<String>,
}

/// One request as the server decoded it.
#[derive(Debug, Clone)]
pub struct Received {
    pub fields: HashMap<String, String>,
    pub filename: Option<String>,
    pub offset: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ServerState {
    pub requests: Vec<Received>,
    /// Stored content by `subdir/filename` (or `filename` without subdir).
    pub files: HashMap<String, Vec<u8>>,
}

pub struct UploadServer {
    pub url: String,
    pub state: Arc<Mutex<ServerState>>,
}

impl UploadServer {
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter_map(|r| r.offset)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(opts: ServerOptions) -> UploadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(ServerState::default()));
    let shared = Arc::clone(&state);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&shared);
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &state, &opts));
        }
    });
    UploadServer {
        url: format!("http://127.0.0.1:{}/upload.php", port),
        state,
    }
}

/// A local URL nothing is listening on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/upload.php", port)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut data = Vec::new();
    let mut buf = [0u8; 16 * 1024];
    let header_end = loop {
        if let Some(i) = find(&data, b"\r\n\r\n", 0) {
            break i;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    };
    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[header_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some((head, body))
}

struct Part {
    name: String,
    filename: Option<String>,
    data: Vec<u8>,
}

fn header_param(headers: &str, key: &str) -> Option<String> {
    let marker = format!("; {}=\"", key);
    let start = headers.find(&marker)? + marker.len();
    let end = headers[start..].find('"')? + start;
    Some(headers[start..end].to_string())
}

fn parse_multipart(head: &str, body: &[u8]) -> Vec<Part> {
    let Some(boundary) = head
        .lines()
        .find(|l| l.to_ascii_lowercase().starts_with("content-type:"))
        .and_then(|l| l.split_once("boundary="))
        .map(|(_, b)| b.trim().to_string())
    else {
        return Vec::new();
    };
    let delim = format!("--{}", boundary).into_bytes();
    let mut marks = Vec::new();
    let mut at = 0;
    while let Some(i) = find(body, &delim, at) {
        marks.push(i);
        at = i + delim.len();
    }
    let mut parts = Vec::new();
    for pair in marks.windows(2) {
        let seg = &body[pair[0] + delim.len()..pair[1]];
        let seg = seg.strip_prefix(b"\r\n").unwrap_or(seg);
        let seg = seg.strip_suffix(b"\r\n").unwrap_or(seg);
        let Some(split) = find(seg, b"\r\n\r\n", 0) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&seg[..split]).into_owned();
        let Some(name) = header_param(&headers, "name") else {
            continue;
        };
        parts.push(Part {
            name,
            filename: header_param(&headers, "filename"),
            data: seg[split + 4..].to_vec(),
        });
    }
    parts
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn reply(success: bool, message: &str) -> String {
    format!(r#"{{"success":{},"message":"{}"}}"#, success, message)
}

fn handle(mut stream: TcpStream, state: &Mutex<ServerState>, opts: &ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };
    let parts = parse_multipart(&head, &body);

    let mut fields = HashMap::new();
    let mut file_part = None;
    let mut chunk = None;
    for part in parts {
        match part.name.as_str() {
            "file" => file_part = Some((part.filename.unwrap_or_default(), part.data)),
            "chunk" => chunk = Some(part.data),
            _ => {
                fields.insert(part.name, String::from_utf8_lossy(&part.data).into_owned());
            }
        }
    }
    let offset = fields.get("offset").and_then(|o| o.parse::<u64>().ok());
    let filename = fields
        .get("filename")
        .cloned()
        .or_else(|| file_part.as_ref().map(|(n, _)| n.clone()));

    let mut st = state.lock().unwrap();
    let index = st.requests.len();
    st.requests.push(Received {
        fields: fields.clone(),
        filename: filename.clone(),
        offset,
    });

    if opts.fail_requests.contains(&index) {
        drop(st);
        respond(&mut stream, "500 Internal Server Error", "oops");
        return;
    }
    if let Some(raw) = &opts.raw_reply {
        drop(st);
        respond(&mut stream, "200 OK", raw);
        return;
    }
    if fields.get("key").map(String::as_str) != Some(opts.key.as_str()) {
        drop(st);
        respond(&mut stream, "200 OK", &reply(false, "Invalid key"));
        return;
    }

    let Some(name) = filename else {
        drop(st);
        respond(&mut stream, "200 OK", &reply(false, "No file uploaded"));
        return;
    };
    let stored = match fields.get("subdir") {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    };

    let message = if let Some(data) = chunk {
        let offset = offset.unwrap_or(0) as usize;
        let entry = st.files.entry(stored).or_default();
        if entry.len() != offset {
            let msg = format!("offset {} does not match stored {}", offset, entry.len());
            drop(st);
            respond(&mut stream, "200 OK", &reply(false, &msg));
            return;
        }
        entry.extend_from_slice(&data);
        "Chunk uploaded successfully"
    } else if let Some((_, data)) = file_part {
        st.files.insert(stored, data);
        "File uploaded successfully"
    } else {
        drop(st);
        respond(&mut stream, "200 OK", &reply(false, "No file uploaded"));
        return;
    };
    drop(st);
    respond(&mut stream, "200 OK", &reply(true, message));
}
