//! Mock CyberVault API server for testing
//!
//! Simulates the endpoints the client talks to, with the same response
//! shapes as the real server:
//! - POST /register returns { status: "registered", user_id } or { error }
//! - POST /login returns { status: "authenticated", token, user_id } or { error }
//! - POST /transaction returns { status: "queued", fraud_flag: 0|1 }
//! - GET /transactions returns { transactions: [[...], ...] }
//! - GET /blockchain returns { blockchain: [[...], ...] }
//! - GET /status returns { status }

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

/// PIN the mock accepts for every user
pub const MOCK_PIN: &str = "402917";

/// Token the mock hands out and expects back
pub const MOCK_TOKEN: &str = "mock-token-0123456789";

/// Amounts above this are flagged as fraud
const FRAUD_THRESHOLD: f64 = 1000.0;

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }
}

/// Configuration for the mock
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every transaction submission with HTTP 500
    pub fail_transactions: bool,
    /// Usernames that already exist
    pub existing_users: Vec<String>,
}

/// Mock CyberVault server
pub struct MockCyberVaultServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockCyberVaultServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        Self::start_on(0, config)
    }

    /// Start on a given port, e.g. one a client was already pointed at
    /// while nothing was listening
    pub fn start_on(port: u16, config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));

        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let log = requests_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &log));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockCyberVaultServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    // Headers first
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            let (k, v) = line.split_once(':')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    // Then the rest of the body
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body_end = (header_end + content_length).min(data.len());
    let body = String::from_utf8_lossy(&data[header_end..body_end]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn handle_connection(
    mut stream: TcpStream,
    config: &MockConfig,
    log: &Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => {
            send_response(&mut stream, 400, &json!({"error": "Invalid request"}));
            return;
        }
    };

    if let Ok(mut log) = log.lock() {
        log.push(request.clone());
    }

    let (status, body) = route(&request, config);
    send_response(&mut stream, status, &body);
}

fn route(request: &RecordedRequest, config: &MockConfig) -> (u16, JsonValue) {
    let body = request.json();

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/status") => (200, json!({"status": "CyberVault backend running"})),

        ("POST", "/register") => {
            let username = body["username"].as_str().unwrap_or("");
            let pin = body["pin"].as_str().unwrap_or("");
            if username.is_empty() || pin.is_empty() {
                (400, json!({"error": "Missing username or pin"}))
            } else if config.existing_users.iter().any(|u| u == username) {
                (409, json!({"error": "User already exists"}))
            } else {
                (200, json!({"status": "registered", "user_id": format!("uid-{}", username)}))
            }
        }

        ("POST", "/login") => {
            let username = body["username"].as_str().unwrap_or("");
            if body["pin"].as_str() == Some(MOCK_PIN) && !username.is_empty() {
                (
                    200,
                    json!({
                        "status": "authenticated",
                        "token": MOCK_TOKEN,
                        "user_id": format!("uid-{}", username)
                    }),
                )
            } else {
                (401, json!({"error": "Invalid credentials"}))
            }
        }

        ("POST", "/transaction") => {
            let expected = format!("Bearer {}", MOCK_TOKEN);
            if request.header("Authorization") != Some(expected.as_str()) {
                return (401, json!({"error": "Unauthorized"}));
            }
            if config.fail_transactions {
                return (500, json!({"error": "Internal error"}));
            }
            if body["user_id"].is_null() || body["data"].is_null() || body["timestamp"].is_null()
            {
                return (400, json!({"error": "Missing fields"}));
            }
            let amount = body["data"]["amount"]
                .as_str()
                .and_then(|a| a.parse::<f64>().ok())
                .unwrap_or(0.0);
            let flag = if amount > FRAUD_THRESHOLD { 1 } else { 0 };
            (200, json!({"status": "queued", "fraud_flag": flag}))
        }

        ("GET", "/transactions") => (
            200,
            json!({"transactions": [
                [1, "uid-alice", "9f86d081", "queued", 0, "2025-06-01T12:00:00.000Z"],
                [2, "uid-alice", "3b2c1a00", "queued", 1, "2025-06-01T12:05:00.000Z"]
            ]}),
        ),

        ("GET", "/blockchain") => (
            200,
            json!({"blockchain": [
                [1, "00ab", "", "ff01", "2025-06-01T12:00:00.000Z"],
                [2, "00cd", "00ab", "ff02", "2025-06-01T12:10:00.000Z"]
            ]}),
        ),

        _ => (404, json!({"error": "Unknown endpoint"})),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Internal Server Error",
    };
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
