//! Dispatch and response classification
//!
//! [`NetworkService`] drives each [`RequestBuilder`](crate::http::RequestBuilder)
//! through build, transport and classification, and hands the caller exactly
//! one `Result<Response, ServiceError>`. [`ResponseClassifier`] owns the
//! status-code policy.

mod classifier;
mod delegates;
mod error;
mod service;
mod settings;

pub use classifier::ResponseClassifier;
pub use delegates::{
    AnalyticsDelegate, AnalyticsEvent, AuditDelegate, TracingAnalyticsDelegate,
    TracingAuditDelegate,
};
pub use error::{ErrorCause, ErrorDomain, ServiceError, ShutteredModel};
pub use service::{DispatcherSnapshot, Handler, NetworkService, RequestId};
pub use settings::{Dependencies, NetworkSettings};
