//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use std::error::Error as _;
use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Result, Transport, TransportError};
use crate::http::{HeadersMap, HttpRequest, Method, Response};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("mobilecore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Transport over a shared reqwest [`Client`]
///
/// `cancel_all` bumps a generation counter; every in-flight `send` watches it
/// and resolves with [`TransportError::Cancelled`] when it moves.
pub struct HttpTransport {
    client: Client,
    cancel: watch::Sender<u64>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let (cancel, _) = watch::channel(0);
        Ok(Self { client, cancel })
    }

    /// Wait `delay`, then send
    pub async fn send_after(&self, request: HttpRequest, delay: Duration) -> Result<Response> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.send(request).await
    }

    async fn execute(&self, request: HttpRequest) -> Result<Response> {
        let url = request.url.to_string();
        debug!(method = %request.method, url, "Sending request");

        let mut builder = self.client.request(reqwest_method(request.method), request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(directive) = request.cache_policy.cache_control_directive() {
            if !request
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(CACHE_CONTROL.as_str()))
            {
                builder = builder.header(CACHE_CONTROL, directive);
            }
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers: HeadersMap = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(map_body_error)?;

        debug!(url, status, size = body.len(), "Response received");

        Ok(Response {
            body,
            status: Some(status),
            headers,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<Response> {
        let mut cancelled = self.cancel.subscribe();

        tokio::select! {
            biased;
            _ = cancelled.changed() => {
                warn!(url = %request.url, "Request cancelled");
                Err(TransportError::Cancelled)
            }
            result = self.execute(request.clone()) => result,
        }
    }

    fn cancel_all(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() || io_error_kind(&e) == Some(io::ErrorKind::TimedOut) {
        TransportError::Timeout
    } else if e.is_connect() || io_error_kind(&e).is_some_and(is_dropped_connection) {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}

/// Failures after the status line are connection-level: the peer stalled,
/// closed early or reset while the body was streaming
fn map_body_error(e: reqwest::Error) -> TransportError {
    match map_reqwest_error(e) {
        TransportError::RequestFailed(message) => {
            TransportError::Connect(format!("connection lost while reading body: {message}"))
        }
        other => other,
    }
}

/// First I/O error kind in the source chain, if any
fn io_error_kind(e: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = e.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = err.source();
    }
    None
}

fn is_dropped_connection(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("mobilecore/"));
    }

    #[test]
    fn test_dropped_connection_kinds() {
        assert!(is_dropped_connection(io::ErrorKind::ConnectionReset));
        assert!(is_dropped_connection(io::ErrorKind::UnexpectedEof));
        assert!(!is_dropped_connection(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest_method(Method::Delete), reqwest::Method::DELETE);
    }
}
