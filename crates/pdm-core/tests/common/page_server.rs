//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves per-path routes (status, body, optional delay, optional redirect)
//! and records every request's path and headers when it arrives, before any
//! configured delay.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Duration,
    location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Clone)]
pub struct PageServer {
    port: u16,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start() -> PageServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = PageServer {
        port,
        routes: Arc::new(Mutex::new(HashMap::new())),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = shared.clone();
            thread::spawn(move || shared.handle(stream));
        }
    });
    server
}

impl PageServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://127.0.0.1:<port><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// URL on a named host; pair with a curl `resolve` entry from [`PageServer::resolve_entry`].
    pub fn url_on(&self, host: &str, path: &str) -> String {
        format!("http://{}:{}{}", host, self.port, path)
    }

    pub fn resolve_entry(&self, host: &str) -> String {
        format!("{}:{}:127.0.0.1", host, self.port)
    }

    fn set(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn page(&self, path: &str, body: &[u8]) {
        self.set(
            path,
            Route {
                status: 200,
                body: body.to_vec(),
                delay: Duration::ZERO,
                location: None,
            },
        );
    }

    pub fn status(&self, path: &str, status: u16) {
        self.set(
            path,
            Route {
                status,
                body: b"error".to_vec(),
                delay: Duration::ZERO,
                location: None,
            },
        );
    }

    pub fn slow_page(&self, path: &str, body: &[u8], delay: Duration) {
        self.set(
            path,
            Route {
                status: 200,
                body: body.to_vec(),
                delay,
                location: None,
            },
        );
    }

    pub fn redirect(&self, path: &str, location: &str) {
        self.set(
            path,
            Route {
                status: 302,
                body: Vec::new(),
                delay: Duration::ZERO,
                location: Some(location.to_string()),
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn handle(&self, mut stream: TcpStream) {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        while !data.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => data.extend_from_slice(&buf[..n]),
            }
        }
        let Ok(text) = std::str::from_utf8(&data) else {
            return;
        };
        let recorded = parse_request(text);
        let path = recorded.path.clone();
        self.requests.lock().unwrap().push(recorded);

        let route = self.routes.lock().unwrap().get(&path).cloned();
        let Some(route) = route else {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        };
        if !route.delay.is_zero() {
            thread::sleep(route.delay);
        }
        let location = route
            .location
            .as_deref()
            .map(|l| format!("Location: {}\r\n", l))
            .unwrap_or_default();
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
            route.status,
            reason(route.status),
            route.body.len(),
            location
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&route.body);
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn parse_request(request: &str) -> RecordedRequest {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    RecordedRequest { path, headers }
}
