use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where an underlying failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// HTTP status outside the success range
    Status,
    /// DNS, refused or reset connections
    Connectivity,
    Timeout,
    Cancelled,
    /// Request assembly failed before any I/O
    Build,
    /// Any other transport-level failure
    Transport,
}

impl ErrorDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorDomain::Status => "status",
            ErrorDomain::Connectivity => "connectivity",
            ErrorDomain::Timeout => "timeout",
            ErrorDomain::Cancelled => "cancelled",
            ErrorDomain::Build => "build",
            ErrorDomain::Transport => "transport",
        }
    }

    /// Domains the user can fix by getting a better connection
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ErrorDomain::Connectivity | ErrorDomain::Timeout)
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause carried by the `ServiceError` variants that wrap one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain} error {code}: {message}")]
pub struct ErrorCause {
    pub domain: ErrorDomain,
    pub code: i64,
    pub message: String,
}

impl ErrorCause {
    pub fn new(domain: ErrorDomain, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
        }
    }

    /// Cause for a non-success HTTP status
    pub fn status(status: u16) -> Self {
        Self::new(
            ErrorDomain::Status,
            i64::from(status),
            format!("HTTP status {status}"),
        )
    }
}

const DEFAULT_SHUTTERED_TITLE: &str = "Sorry, there is a problem with the service";
const DEFAULT_SHUTTERED_MESSAGE: &str = "Try again later.";

/// Maintenance-mode content shown instead of normal error handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutteredModel {
    pub title: String,
    pub message: String,
}

impl ShutteredModel {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Replace empty fields with the matching field of `fallback`
    pub fn or_fallback(self, fallback: &ShutteredModel) -> Self {
        Self {
            title: if self.title.is_empty() {
                fallback.title.clone()
            } else {
                self.title
            },
            message: if self.message.is_empty() {
                fallback.message.clone()
            } else {
                self.message
            },
        }
    }
}

impl Default for ShutteredModel {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTTERED_TITLE, DEFAULT_SHUTTERED_MESSAGE)
    }
}

/// Terminal failure outcome of a dispatched request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Account locked pending customer contact (HTTP 423)
    #[error("account locked (MCI)")]
    Mci,
    #[error("session rejected, user must log in again")]
    Logout,
    /// Re-dispatching may succeed
    #[error("retryable failure: {0}")]
    Retryable(ErrorCause),
    #[error("resource not found")]
    NotFound,
    #[error("account holder recorded as deceased")]
    Deceased,
    #[error("unrecoverable failure: {0}")]
    Unrecoverable(ErrorCause),
    #[error("service shuttered: {}", .0.title)]
    Shuttered(ShutteredModel),
    #[error("response body was not valid JSON for the expected model")]
    MalformedJson,
    #[error("internet connectivity issue: {0}")]
    InternetConnectivityIssue(ErrorCause),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Retryable(_))
    }

    /// Short tag for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Mci => "mci",
            ServiceError::Logout => "logout",
            ServiceError::Retryable(_) => "retryable",
            ServiceError::NotFound => "not_found",
            ServiceError::Deceased => "deceased",
            ServiceError::Unrecoverable(_) => "unrecoverable",
            ServiceError::Shuttered(_) => "shuttered",
            ServiceError::MalformedJson => "malformed_json",
            ServiceError::InternetConnectivityIssue(_) => "internet_connectivity_issue",
        }
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        match self {
            ServiceError::Retryable(cause)
            | ServiceError::Unrecoverable(cause)
            | ServiceError::InternetConnectivityIssue(cause) => Some(cause),
            _ => None,
        }
    }
}
