//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths, each with its own behaviour: byte ranges on
//! or off, a Content-Disposition header, an error status, a redirect, or a
//! mid-body stall. Every request is recorded so tests can assert on the
//! exact HEAD/GET traffic and Range offsets.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Behaviour of one served path.
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub body: Vec<u8>,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Whether to send `Accept-Ranges: bytes`, independent of `support_ranges`.
    pub advertise_ranges: bool,
    pub content_disposition: Option<String>,
    /// Status for both HEAD and GET; bodies are only sent with 200/206.
    pub status: u16,
    /// Answer with `302 Found` to this path instead.
    pub redirect_to: Option<String>,
    /// On GET, send this many body bytes and then go quiet for `stall_for`.
    pub stall_after: Option<usize>,
    pub stall_for: Duration,
}

impl ServedFile {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            support_ranges: true,
            advertise_ranges: true,
            content_disposition: None,
            status: 200,
            redirect_to: None,
            stall_after: None,
            stall_for: Duration::from_secs(5),
        }
    }

    pub fn without_ranges(mut self) -> Self {
        self.support_ranges = false;
        self.advertise_ranges = false;
        self
    }

    /// Sends `Accept-Ranges: bytes` but answers every GET with the full body.
    pub fn ignoring_ranges(mut self) -> Self {
        self.support_ranges = false;
        self.advertise_ranges = true;
        self
    }

    pub fn disposition(mut self, value: &str) -> Self {
        self.content_disposition = Some(value.to_string());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn redirect(mut self, path: &str) -> Self {
        self.redirect_to = Some(path.to_string());
        self
    }

    pub fn stall_after(mut self, bytes: usize) -> Self {
        self.stall_after = Some(bytes);
        self
    }
}

/// One request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Start of `Range: bytes=N-`, if sent.
    pub range_start: Option<u64>,
}

/// Handle to a running server.
#[derive(Clone)]
pub struct RangeServer {
    base: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl RangeServer {
    /// Full URL of `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// GETs recorded for `path`, as their Range start (0 when none was sent).
    pub fn gets(&self, path: &str) -> Vec<u64> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET" && r.path == path)
            .map(|r| r.range_start.unwrap_or(0))
            .collect()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(files: Vec<(&str, ServedFile)>) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<HashMap<String, ServedFile>> = Arc::new(
        files
            .into_iter()
            .map(|(path, file)| (path.to_string(), file))
            .collect(),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let log = Arc::clone(&server_log);
            thread::spawn(move || handle(stream, &files, &log));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{port}"),
        log,
    }
}

fn handle(mut stream: TcpStream, files: &HashMap<String, ServedFile>, log: &Mutex<Vec<Recorded>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(text) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let request = parse_request(text);
    log.lock().unwrap().push(request.clone());

    let Some(file) = files.get(&request.path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    };
    if let Some(target) = &file.redirect_to {
        let response = format!(
            "HTTP/1.1 302 Found\r\nLocation: {target}\r\nContent-Length: 0\r\n\r\n"
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let mut headers = String::new();
    if file.advertise_ranges {
        headers.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(cd) = &file.content_disposition {
        headers.push_str(&format!("Content-Disposition: {cd}\r\n"));
    }
    let total = file.body.len();

    if file.status != 200 {
        let response = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\n{headers}\r\n",
            file.status
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if request.method == "HEAD" {
        let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {total}\r\n{headers}\r\n");
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if request.method != "GET" {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        return;
    }

    let (status, slice) = match request.range_start {
        Some(start) if file.support_ranges && (start as usize) < total => {
            let start = start as usize;
            headers.push_str(&format!(
                "Content-Range: bytes {start}-{}/{total}\r\n",
                total - 1
            ));
            ("206 Partial Content", &file.body[start..])
        }
        _ => ("200 OK", &file.body[..]),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\n{headers}\r\n",
        slice.len()
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    match file.stall_after {
        Some(cut) if cut < slice.len() => {
            let _ = stream.write_all(&slice[..cut]);
            let _ = stream.flush();
            thread::sleep(file.stall_for);
        }
        _ => {
            let _ = stream.write_all(slice);
        }
    }
}

fn parse_request(request: &str) -> Recorded {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_ascii_uppercase();
    let path = first.next().unwrap_or("/").to_string();

    let mut range_start = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("range") {
            range_start = value
                .trim()
                .strip_prefix("bytes=")
                .and_then(|v| v.split_once('-'))
                .and_then(|(start, _)| start.trim().parse::<u64>().ok());
        }
    }
    Recorded {
        method,
        path,
        range_start,
    }
}
