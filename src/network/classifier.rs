use std::sync::Arc;
use tracing::{debug, info, warn};

use super::delegates::{AnalyticsDelegate, AnalyticsEvent, AuditDelegate};
use super::error::{ErrorCause, ServiceError, ShutteredModel};
use crate::http::{HttpRequest, Response};

const FORBIDDEN_CATEGORY: &str = "errors";
const FORBIDDEN_ACTION: &str = "forbidden";
const FORBIDDEN_LABEL: &str = "403 forbidden";

/// Maps transport outcomes onto the [`ServiceError`] taxonomy
///
/// Pure apart from the audit and analytics side channels. Classification is
/// advisory: a `Retryable` outcome is never retried here.
#[derive(Clone, Default)]
pub struct ResponseClassifier {
    audit: Option<Arc<dyn AuditDelegate>>,
    analytics: Option<Arc<dyn AnalyticsDelegate>>,
    default_shuttered: ShutteredModel,
}

impl ResponseClassifier {
    pub fn new(
        audit: Option<Arc<dyn AuditDelegate>>,
        analytics: Option<Arc<dyn AnalyticsDelegate>>,
    ) -> Self {
        Self {
            audit,
            analytics,
            default_shuttered: ShutteredModel::default(),
        }
    }

    /// Model used for 503 and as the fallback for 521 bodies
    pub fn with_default_shuttered(mut self, model: ShutteredModel) -> Self {
        self.default_shuttered = model.or_fallback(&ShutteredModel::default());
        self
    }

    pub fn default_shuttered(&self) -> &ShutteredModel {
        &self.default_shuttered
    }

    /// Classify a response that reached us from the transport
    pub fn classify(
        &self,
        request: &HttpRequest,
        response: Response,
    ) -> Result<Response, ServiceError> {
        self.audit(request, &response);

        let Some(status) = response.status else {
            return Err(self.classify_error(ErrorCause::new(
                super::ErrorDomain::Transport,
                0,
                "response carried no status code",
            )));
        };

        debug!(url = %request.url, status, "Classifying response");

        match status {
            200..=399 => Ok(response),
            401 | 403 => {
                self.track(
                    AnalyticsEvent::new(FORBIDDEN_CATEGORY, FORBIDDEN_ACTION)
                        .with_label(FORBIDDEN_LABEL),
                );
                Err(ServiceError::Logout)
            }
            404 => Err(ServiceError::NotFound),
            410 => Err(ServiceError::Deceased),
            423 => Err(ServiceError::Mci),
            521 => Err(ServiceError::Shuttered(self.decode_shuttered(&response.body))),
            503 => Err(ServiceError::Shuttered(self.default_shuttered.clone())),
            400..=499 => Err(ServiceError::Unrecoverable(ErrorCause::status(status))),
            500..=599 => Err(ServiceError::Retryable(ErrorCause::status(status))),
            _ => Err(self.classify_error(ErrorCause::status(status))),
        }
    }

    /// Classify a failure that produced no usable response
    pub fn classify_error(&self, cause: ErrorCause) -> ServiceError {
        if cause.domain.is_connectivity() {
            ServiceError::InternetConnectivityIssue(cause)
        } else {
            ServiceError::Unrecoverable(cause)
        }
    }

    fn decode_shuttered(&self, body: &[u8]) -> ShutteredModel {
        match serde_json::from_slice::<ShutteredModel>(body) {
            Ok(model) => model.or_fallback(&self.default_shuttered),
            Err(e) => {
                warn!(error = %e, "Shuttered body did not decode, using default model");
                self.default_shuttered.clone()
            }
        }
    }

    fn audit(&self, request: &HttpRequest, response: &Response) {
        match &self.audit {
            Some(delegate) => delegate.record(request, &response.body, response),
            None => info!("No audit delegate configured, skipping audit event"),
        }
    }

    fn track(&self, event: AnalyticsEvent) {
        match &self.analytics {
            Some(delegate) => delegate.record(event),
            None => info!(
                action = %event.action,
                "No analytics delegate configured, dropping analytics event"
            ),
        }
    }
}
