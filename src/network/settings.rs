use std::sync::Arc;
use url::Url;

use super::delegates::{AnalyticsDelegate, AuditDelegate};
use super::error::ShutteredModel;
use crate::config::{Config, ConfigError, ValidationError};
use crate::fraud::FraudPrevention;
use crate::http::HeadersMap;
use crate::spinner::{NetworkSpinner, SpinnerPolicy};
use crate::transport::Transport;

/// Dispatcher configuration resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub spinner_policy: SpinnerPolicy,
    pub include_anti_fraud_headers: bool,
    /// Preliminary headers for builders that bring none of their own
    pub default_headers: HeadersMap,
    pub default_shuttered: ShutteredModel,
    pub base_url: Option<Url>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            spinner_policy: SpinnerPolicy::default(),
            include_anti_fraud_headers: true,
            default_headers: HeadersMap::new(),
            default_shuttered: ShutteredModel::default(),
            base_url: None,
        }
    }
}

impl NetworkSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_url = config
            .request
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| ValidationError::InvalidBaseUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            spinner_policy: config.spinner_policy()?,
            include_anti_fraud_headers: config.request.include_anti_fraud_headers,
            default_headers: config.request.default_headers.clone(),
            default_shuttered: config.shuttered_model(),
            base_url,
        })
    }
}

/// Collaborators injected into the dispatcher
///
/// Transport and spinner are required; leaving either unset is a compile
/// error on `build()`. Delegates and the fraud supplier are optional.
#[derive(bon::Builder, Clone)]
pub struct Dependencies {
    pub transport: Arc<dyn Transport>,
    pub spinner: Arc<dyn NetworkSpinner>,
    pub audit: Option<Arc<dyn AuditDelegate>>,
    pub analytics: Option<Arc<dyn AnalyticsDelegate>>,
    pub fraud_prevention: Option<Arc<dyn FraudPrevention>>,
}
