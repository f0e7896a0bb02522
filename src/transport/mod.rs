//! Network I/O seam
//!
//! The dispatcher never touches sockets itself; it hands a finalized
//! [`HttpRequest`] to a [`Transport`] and classifies whatever comes back.
//! [`HttpTransport`] is the reqwest-backed implementation; tests supply fakes.

mod http;

pub use http::{HttpConfig, HttpTransport};

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpRequest, Response};
use crate::network::{ErrorCause, ErrorDomain};

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection timeout")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            TransportError::Connect(_) => ErrorDomain::Connectivity,
            TransportError::Timeout => ErrorDomain::Timeout,
            TransportError::Cancelled => ErrorDomain::Cancelled,
            TransportError::InvalidRequest(_) | TransportError::RequestFailed(_) => {
                ErrorDomain::Transport
            }
        }
    }
}

impl From<&TransportError> for ErrorCause {
    fn from(error: &TransportError) -> Self {
        ErrorCause::new(error.domain(), 0, error.to_string())
    }
}

/// Performs the actual round-trip for a built request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send once; a received response of any status is `Ok`
    async fn send(&self, request: HttpRequest) -> Result<Response>;

    /// Abandon every in-flight `send`; they resolve with `Cancelled`
    fn cancel_all(&self);
}
