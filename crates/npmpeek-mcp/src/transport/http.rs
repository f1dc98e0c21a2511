use std::{io, sync::Arc, time::Duration};

use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

use super::MAX_MESSAGE_SIZE;
use crate::{
    error::{McpError, Result},
    server::{McpServer, SERVER_NAME, SERVER_VERSION},
};

const MAX_HEAD_SIZE: usize = 16 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(30);

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    (
        "Access-Control-Allow-Headers",
        "Content-Type, Authorization, Mcp-Session-Id",
    ),
];

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    /// Header names are lowercased.
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: Option<&'static str>,
    extra_headers: Vec<(&'static str, &'static str)>,
    body: Vec<u8>,
}

impl Reply {
    fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            extra_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            extra_headers: Vec::new(),
            body: value.to_string().into_bytes(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n");
        for (name, value) in CORS_HEADERS.iter().chain(self.extra_headers.iter()) {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        431 => "Request Header Fields Too Large",
        _ => "Internal Server Error",
    }
}

fn parse_head(head: &str) -> std::result::Result<(String, String, Vec<(String, String)>), Reply> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(_version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Reply::error(400, "Malformed request line"));
    };

    let mut headers = Vec::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            return Err(Reply::error(400, "Malformed header"));
        };
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    Ok((method.to_string(), path.to_string(), headers))
}

/// Reads one request. Protocol violations come back as the reply to send.
async fn read_request(stream: &mut TcpStream) -> io::Result<std::result::Result<HttpRequest, Reply>> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Ok(Err(Reply::error(431, "Request head too large")));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the request head ended",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let (method, path, headers) = match parse_head(&head) {
        Ok(parsed) => parsed,
        Err(reply) => return Ok(Err(reply)),
    };

    let mut request = HttpRequest {
        method,
        path,
        headers,
        body: buf[head_end + 4..].to_vec(),
    };

    let length = match request.header("content-length") {
        Some(value) => match value.parse::<usize>() {
            Ok(length) => length,
            Err(_) => return Ok(Err(Reply::error(400, "Invalid Content-Length"))),
        },
        None if request.method == "POST" => {
            return Ok(Err(Reply::error(411, "Content-Length required")));
        }
        None => 0,
    };
    if length > MAX_MESSAGE_SIZE {
        return Ok(Err(Reply::error(413, "Request body exceeds 1 MiB")));
    }

    if request.body.len() < length {
        let mut rest = vec![0u8; length - request.body.len()];
        stream.read_exact(&mut rest).await?;
        request.body.extend_from_slice(&rest);
    }
    request.body.truncate(length);

    Ok(Ok(request))
}

/// MCP over HTTP: `POST /mcp` for JSON-RPC and `GET /health`, one request
/// per connection.
#[derive(Clone)]
pub struct HttpTransport {
    server: McpServer,
    auth_token: Option<Arc<str>>,
}

impl HttpTransport {
    pub fn new(server: McpServer, auth_token: Option<String>) -> Self {
        Self {
            server,
            auth_token: auth_token.map(Arc::from),
        }
    }

    pub async fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr).await.map_err(|source| {
            McpError::Bind {
                addr: addr.to_string(),
                source,
            }
        })
    }

    /// Accepts connections until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(
            "serving MCP over HTTP on http://{} (auth {})",
            listener.local_addr()?,
            if self.auth_token.is_some() { "on" } else { "off" }
        );

        loop {
            let (stream, peer) = listener.accept().await?;
            let transport = self.clone();
            tokio::spawn(async move {
                if let Err(err) = transport.handle_connection(stream).await {
                    debug!("connection from {} failed: {}", peer, err);
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        let reply = match tokio::time::timeout(READ_TIMEOUT, read_request(&mut stream)).await {
            Err(_) => Reply::error(408, "Timed out reading the request"),
            Ok(result) => {
                match result? {
                    Ok(request) => self.route(request).await,
                    Err(reply) => reply,
                }
            }
        };

        stream.write_all(&reply.encode()).await?;
        stream.flush().await?;
        stream.shutdown().await
    }

    fn authorized(&self, request: &HttpRequest) -> bool {
        let Some(expected) = self.auth_token.as_deref() else {
            return true;
        };

        request
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| tokens_match(token.trim().as_bytes(), expected.as_bytes()))
    }

    async fn route(&self, request: HttpRequest) -> Reply {
        debug!("{} {}", request.method, request.path);

        if !self.authorized(&request) {
            warn!("rejected unauthorized {} {}", request.method, request.path);
            return Reply::error(401, "Unauthorized").with_header("WWW-Authenticate", "Bearer");
        }

        let path = request.path.split('?').next().unwrap_or_default();
        match (request.method.as_str(), path) {
            ("OPTIONS", _) => Reply::empty(204),
            ("GET", "/health") => {
                Reply::json(
                    200,
                    &json!({
                        "status": "ok",
                        "name": SERVER_NAME,
                        "version": SERVER_VERSION
                    }),
                )
            }
            ("POST", "/mcp") => {
                let body = String::from_utf8_lossy(&request.body);
                match self.server.handle_message(&body).await {
                    Some(response) => match serde_json::to_value(&response) {
                        Ok(value) => Reply::json(200, &value),
                        Err(err) => Reply::error(500, &err.to_string()),
                    },
                    None => Reply::empty(202),
                }
            }
            (_, "/mcp") | (_, "/health") => Reply::error(405, "Method not allowed"),
            _ => Reply::error(404, "Not found"),
        }
    }
}

/// Byte comparison whose running time does not depend on where the first
/// mismatch is.
fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
