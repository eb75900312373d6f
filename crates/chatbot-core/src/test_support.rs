//! Throwaway HTTP responder for exercising the chat client.
//!
//! Each canned response answers exactly one connection, in order. Every
//! request that arrives is parsed and handed back to the test.

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as the backend saw it.
#[derive(Debug)]
pub struct SeenRequest {
    pub method: String,
    pub content_type: Option<String>,
    pub body: Value,
}

pub struct MockBackend {
    pub url: String,
    requests: mpsc::UnboundedReceiver<SeenRequest>,
}

impl MockBackend {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let responses = responses
            .into_iter()
            .map(|(status, body)| (status, reason(status), body))
            .collect();
        Self::start_with_reasons(responses).await
    }

    /// Like [`start`](Self::start) but with an explicit reason phrase on
    /// each status line.
    pub async fn start_with_reasons(responses: Vec<(u16, &'static str, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, reason_phrase, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                if let Some(seen) = read_request(&mut stream).await {
                    let _ = tx.send(seen);
                }
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason_phrase,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url: format!("http://{}/chat", addr),
            requests: rx,
        }
    }

    pub async fn next_request(&mut self) -> SeenRequest {
        self.requests.recv().await.expect("backend closed before a request arrived")
    }
}

/// A URL on a port nothing is listening on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/chat", addr)
}

async fn read_request(stream: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let method = lines.next()?.split_whitespace().next()?.to_string();

    let mut content_length = 0;
    let mut content_type = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "content-type" => content_type = Some(value.to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some(SeenRequest {
        method,
        content_type,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}
