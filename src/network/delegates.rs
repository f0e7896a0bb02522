//! Side channels fed by the response classifier

use tracing::info;

use crate::http::{HttpRequest, Response};

/// Receives every classified exchange, whatever its status
pub trait AuditDelegate: Send + Sync {
    fn record(&self, request: &HttpRequest, body: &[u8], response: &Response);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub category: String,
    pub action: String,
    pub label: Option<String>,
    pub value: Option<i64>,
}

impl AnalyticsEvent {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: None,
            value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

pub trait AnalyticsDelegate: Send + Sync {
    fn record(&self, event: AnalyticsEvent);
}

/// Audit delegate writing each exchange to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditDelegate;

impl AuditDelegate for TracingAuditDelegate {
    fn record(&self, request: &HttpRequest, body: &[u8], response: &Response) {
        info!(
            method = %request.method,
            url = %request.url,
            status = ?response.status,
            body_bytes = body.len(),
            "Audit: response received"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsDelegate;

impl AnalyticsDelegate for TracingAnalyticsDelegate {
    fn record(&self, event: AnalyticsEvent) {
        info!(
            category = %event.category,
            action = %event.action,
            label = ?event.label,
            value = ?event.value,
            "Analytics event"
        );
    }
}
