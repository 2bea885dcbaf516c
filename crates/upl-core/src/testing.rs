//! Scripted transport and multipart helpers for unit tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::catalog::FileRecord;
use crate::encoder::EncodedForm;
use crate::error::UploadError;
use crate::transport::Transport;

/// One decoded form part.
#[derive(Debug, Clone)]
pub(crate) struct SentPart {
    pub name: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

/// Decoded request as the fake server saw it.
#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub parts: Vec<SentPart>,
}

impl SentRequest {
    pub fn field(&self, name: &str) -> Option<String> {
        self.part(name)
            .map(|p| String::from_utf8_lossy(&p.data).into_owned())
    }

    pub fn part(&self, name: &str) -> Option<&SentPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Uploaded filename: the `filename` field for chunks, the file part's filename otherwise.
    pub fn upload_name(&self) -> Option<String> {
        self.field("filename")
            .or_else(|| self.part("file").and_then(|p| p.filename.clone()))
    }

    pub fn offset(&self) -> Option<u64> {
        self.field("offset").and_then(|s| s.parse().ok())
    }
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

fn header_param(headers: &str, key: &str) -> Option<String> {
    let marker = format!("; {}=\"", key);
    let start = headers.find(&marker)? + marker.len();
    let end = headers[start..].find('"')? + start;
    Some(headers[start..end].to_string())
}

/// Split an encoded multipart body back into parts.
pub(crate) fn parse_form(form: &EncodedForm) -> SentRequest {
    let delim = format!("--{}", form.boundary).into_bytes();
    let body = &form.body;
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
        let split = find(seg, b"\r\n\r\n", 0).expect("part headers");
        let headers = String::from_utf8_lossy(&seg[..split]).into_owned();
        parts.push(SentPart {
            name: header_param(&headers, "name").expect("part name"),
            filename: header_param(&headers, "filename"),
            data: seg[split + 4..].to_vec(),
        });
    }
    SentRequest { parts }
}

type RequestHook = Box<dyn FnMut(usize) + Send>;

/// In-memory [`Transport`] answering `{"success":true}` unless scripted otherwise.
#[derive(Default)]
pub(crate) struct FakeTransport {
    requests: Mutex<Vec<SentRequest>>,
    /// 0-based request indexes that fail with a connection error.
    fail_calls: Mutex<HashSet<usize>>,
    /// Remaining connection failures per uploaded filename.
    fail_names: Mutex<HashMap<String, u32>>,
    /// Body returned instead of the default success reply.
    reply: Mutex<Option<String>>,
    delay: Option<Duration>,
    /// Called with the request index after a request is accepted, before replying.
    hook: Mutex<Option<RequestHook>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request for `delay` so overlap can be observed.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_call(&self, index: usize) {
        self.fail_calls.lock().unwrap().insert(index);
    }

    pub fn fail_name(&self, name: &str, times: u32) {
        self.fail_names
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
    }

    pub fn reply_with(&self, body: &str) {
        *self.reply.lock().unwrap() = Some(body.to_string());
    }

    /// Run `f` on the blocking worker after each successful request.
    pub fn on_request(&self, f: impl FnMut(usize) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(f));
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.requests().iter().filter_map(SentRequest::offset).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn post(&self, form: &EncodedForm) -> Result<String, UploadError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let request = parse_form(form);
        let name = request.upload_name().unwrap_or_default();
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        if self.fail_calls.lock().unwrap().contains(&index) {
            return Err(UploadError::Curl(curl::Error::new(7)));
        }
        if let Some(left) = self.fail_names.lock().unwrap().get_mut(&name) {
            if *left > 0 {
                *left -= 1;
                return Err(UploadError::Curl(curl::Error::new(7)));
            }
        }
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(index);
        }
        Ok(self
            .reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| r#"{"success":true,"message":"ok"}"#.to_string()))
    }
}

/// Write `len` patterned bytes to `dir/name` and catalog it relative to `dir`.
pub(crate) fn write_record(dir: &Path, name: &str, len: usize) -> FileRecord {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    fs::write(&path, data).unwrap();
    FileRecord::from_path(&path, dir).unwrap()
}
