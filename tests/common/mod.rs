//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resilient_client::config::ClientConfig;
use resilient_client::QueueEvent;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// A request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `"METHOD path"` for every request, in arrival order.
    pub fn log(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The handler gets the request and its 0-based arrival index and returns
/// `(status, body)`. Bodies that parse as JSON are sent as `application/json`.
pub async fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&CapturedRequest, u32) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::new(AtomicU32::new(0));
    let f = Arc::new(f);

    let captured = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let captured = captured.clone();
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        let _ = serve(socket, f.as_ref(), &captured, &counter).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

/// Backend answering every request with the same status and body.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move |_, _| (status, body.to_string())).await
}

async fn serve<F>(
    mut socket: TcpStream,
    f: &F,
    captured: &Mutex<Vec<CapturedRequest>>,
    counter: &AtomicU32,
) -> std::io::Result<()>
where
    F: Fn(&CapturedRequest, u32) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    let request = CapturedRequest {
        method,
        path,
        headers,
        body,
    };
    let index = counter.fetch_add(1, Ordering::SeqCst);
    let (status, body) = f(&request, index);
    captured.lock().unwrap().push(request);

    let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
        "application/json"
    } else {
        "text/plain"
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        content_type,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("resilient-client-it-{}", uuid::Uuid::new_v4()))
}

/// Fast-retry configuration against `base_url`.
pub fn test_config(base_url: &str, storage_dir: Option<PathBuf>) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_ms = 5_000;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config.queue.storage_dir = storage_dir;
    config.queue.redrain_delay_ms = 50;
    config
}

/// Wait for the next event matching `pick`.
pub async fn wait_for<T>(
    events: &mut broadcast::Receiver<QueueEvent>,
    mut pick: impl FnMut(QueueEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(found) = pick(events.recv().await.unwrap()) {
                return found;
            }
        }
    })
    .await
    .expect("queue event not observed")
}

/// Wait until `count` queued requests are delivered.
pub async fn wait_delivered(events: &mut broadcast::Receiver<QueueEvent>, count: usize) {
    for _ in 0..count {
        wait_for(events, |event| match event {
            QueueEvent::Delivered { .. } => Some(()),
            _ => None,
        })
        .await;
    }
}
