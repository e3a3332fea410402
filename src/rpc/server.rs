//! HTTP front end
//!
//! Lightweight blocking HTTP server exposing the registered RPC functions.
//! One thread per connection, no external web framework.
//!
//! ## Running the Server
//!
//! ```bash
//! contentgate serve --port 7350
//!
//! curl -X POST http://127.0.0.1:7350/v2/rpc/my_rpc_function \
//!      -d '{"type":"core","version":"1.0.0"}'
//! ```

use crate::config::ServerConfig;
use crate::error::{ContentGateError, Result};
use crate::rpc::models::{ApiError, AuditPage};
use crate::rpc::module::Module;
use crate::rpc::registry::RpcRegistry;
use crate::storage::AuditStore;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RPC_PREFIX: &str = "/v2/rpc/";

/// Default page size for `/api/files`
const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page `/api/files` returns
const MAX_PAGE_SIZE: usize = 500;

/// State shared across connections
pub struct ServerState {
    /// Registered RPC functions
    pub registry: RpcRegistry,
    /// Audit store, for the history listing
    pub store: AuditStore,
}

impl From<Module> for ServerState {
    fn from(module: Module) -> Self {
        Self {
            registry: module.registry,
            store: module.store,
        }
    }
}

/// Response produced by routing, before it is written to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Value of the `Content-Type` header
    pub content_type: &'static str,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }

    fn error(status: u16, code: &str, message: &str) -> Self {
        let body = serde_json::to_string(&ApiError {
            code: code.to_string(),
            message: message.to_string(),
        })
        .unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", code));
        Self::json(status, body)
    }

    fn from_error(err: &ContentGateError) -> Self {
        let body = serde_json::to_string(&ApiError::from(err))
            .unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", err.kind()));
        Self::json(err.http_status(), body)
    }
}

/// HTTP server
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<ServerState>,
    shutdown: Arc<AtomicBool>,
}

impl ApiServer {
    /// Create a new server
    pub fn new(config: ServerConfig, state: ServerState) -> Self {
        Self {
            config,
            state: Arc::new(state),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get shutdown flag for external control
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Get shared state
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve (blocking)
    pub fn run(&self) -> Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| ContentGateError::connection(&addr, e.to_string()))?;

        self.serve(listener)
    }

    /// Serve on an already bound listener until the shutdown flag is set
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.config.addr());

        listener
            .set_nonblocking(true)
            .map_err(|e| ContentGateError::connection(&addr, e.to_string()))?;

        tracing::info!(%addr, rpcs = ?self.state.registry.ids(), "ContentGate listening");

        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&self.state);
                    let config = self.config.clone();

                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &state, &config) {
                            tracing::warn!(%peer, error = %e, "Connection error");
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept error");
                }
            }
        }

        tracing::info!("Server shutting down");
        Ok(())
    }
}

/// Handle a single HTTP connection
fn handle_connection(stream: TcpStream, state: &ServerState, config: &ServerConfig) -> Result<()> {
    // accepted sockets may inherit non-blocking mode from the listener
    stream.set_nonblocking(false)?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return send_response(&mut writer, &HttpResponse::error(400, "BAD_REQUEST", "Bad Request"));
    }

    let method = parts[0].to_string();
    let target = parts[1].to_string();

    let mut content_length = 0usize;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        if line.trim().is_empty() {
            break;
        }

        if let Some((key, value)) = line.trim().split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    if content_length > config.max_body_size {
        return send_response(
            &mut writer,
            &HttpResponse::error(413, "PAYLOAD_TOO_LARGE", "Request body too large"),
        );
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let response = match String::from_utf8(body) {
        Ok(body) => route_request(&method, &target, &body, state),
        Err(_) => HttpResponse::from_error(&ContentGateError::Decode(
            "payload is not valid UTF-8".to_string(),
        )),
    };

    tracing::debug!(%method, %target, status = response.status, "Request served");
    send_response(&mut writer, &response)
}

/// Route HTTP request to the matching handler
pub fn route_request(method: &str, target: &str, body: &str, state: &ServerState) -> HttpResponse {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let query_params = parse_query_string(query);

    match (method, path) {
        ("GET", "/health") | ("GET", "/api/health") => HttpResponse::plain(200, "OK"),

        ("GET", "/api/files") => {
            let limit = query_params
                .get("limit")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE);

            match list_files(&state.store, limit) {
                Ok(page) => match serde_json::to_string(&page) {
                    Ok(body) => HttpResponse::json(200, body),
                    Err(e) => HttpResponse::from_error(&ContentGateError::Encode(e.to_string())),
                },
                Err(e) => HttpResponse::from_error(&e),
            }
        }

        (method, path) if path.starts_with(RPC_PREFIX) => {
            if method != "POST" {
                return HttpResponse::error(405, "METHOD_NOT_ALLOWED", "Method not allowed");
            }

            let rpc_id = urlencoding_decode(&path[RPC_PREFIX.len()..]);
            match state.registry.invoke(&rpc_id, body) {
                Ok(out) => HttpResponse::json(200, out),
                Err(e) => {
                    tracing::debug!(rpc_id = %rpc_id, error = %e, "RPC failed");
                    HttpResponse::from_error(&e)
                }
            }
        }

        _ => HttpResponse::error(404, "NOT_FOUND", "Not found"),
    }
}

fn list_files(store: &AuditStore, limit: usize) -> Result<AuditPage> {
    let items = store.recent(limit)?.iter().map(|r| r.summary()).collect();
    Ok(AuditPage {
        items,
        total: store.count()?,
    })
}

/// Parse query string into key-value pairs
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((urlencoding_decode(key), urlencoding_decode(value)))
        })
        .collect()
}

/// Simple URL decoding
fn urlencoding_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();

    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hex: Vec<u8> = iter.by_ref().take(2).collect();
                let decoded = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = decoded {
                    bytes.push(byte);
                }
            }
            b'+' => bytes.push(b' '),
            other => bytes.push(other),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Write HTTP response
fn send_response(stream: &mut TcpStream, response: &HttpResponse) -> Result<()> {
    let status_text = match response.status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        response.status,
        status_text,
        response.content_type,
        response.body.len(),
    );

    stream.write_all(head.as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()?;

    Ok(())
}
