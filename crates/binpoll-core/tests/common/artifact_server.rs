//! Minimal scripted HTTP/1.1 server for polling tests.
//!
//! Answers HEAD and GET from a mutable script so a test can change headers,
//! status codes and body between polling cycles. Connections are kept alive
//! across requests; the script is read afresh for each request.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Script {
    pub head_status: u16,
    pub head_headers: Vec<(String, String)>,
    pub get_status: u16,
    pub get_headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            head_status: 200,
            head_headers: Vec::new(),
            get_status: 200,
            get_headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl Script {
    /// Set (or replace) a header sent on HEAD responses.
    pub fn head_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.head_headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.head_headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub struct ArtifactServer {
    base: String,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    heads: AtomicUsize,
    gets: AtomicUsize,
    connections: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl ArtifactServer {
    /// Starts the server in a background thread. It runs until the process exits.
    pub fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            script: Mutex::new(script),
            ..Shared::default()
        });
        {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || serve_connection(stream, &shared));
                }
            });
        }
        ArtifactServer {
            base: format!("http://127.0.0.1:{}", port),
            shared,
        }
    }

    /// Absolute URL for `path` (e.g. "/app.gz").
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn update(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.script.lock().unwrap());
    }

    pub fn head_count(&self) -> usize {
        self.shared.heads.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.shared.gets.load(Ordering::SeqCst)
    }

    /// TCP connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Raw request heads (request line and headers) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.shared.requests.lock().unwrap().clone()
    }
}

/// A URL on localhost where nothing is listening.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/app", port)
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn serve_connection(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut pending = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let end = loop {
            if let Some(pos) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => pending.extend_from_slice(&buf[..n]),
            }
        };
        let request: Vec<u8> = pending.drain(..end).collect();
        let request = String::from_utf8_lossy(&request).into_owned();
        if !respond(&mut stream, &request, shared) {
            return;
        }
    }
}

/// Answer one request. Returns false when the connection should be closed.
fn respond(stream: &mut TcpStream, request: &str, shared: &Shared) -> bool {
    shared.requests.lock().unwrap().push(request.to_string());
    let script = shared.script.lock().unwrap().clone();
    let method = request.split_whitespace().next().unwrap_or("");

    let (status, headers, body): (u16, &[(String, String)], &[u8]) =
        if method.eq_ignore_ascii_case("HEAD") {
            shared.heads.fetch_add(1, Ordering::SeqCst);
            (script.head_status, script.head_headers.as_slice(), &[][..])
        } else if method.eq_ignore_ascii_case("GET") {
            shared.gets.fetch_add(1, Ordering::SeqCst);
            (script.get_status, script.get_headers.as_slice(), script.body.as_slice())
        } else {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
            return false;
        };

    let mut response = format!("HTTP/1.1 {} {}\r\n", status, reason(status));
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    if method.eq_ignore_ascii_case("GET") {
        response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    response.push_str("\r\n");
    stream.write_all(response.as_bytes()).is_ok()
        && stream.write_all(body).is_ok()
        && stream.flush().is_ok()
}
