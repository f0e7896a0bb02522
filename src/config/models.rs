use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub spinner: SpinnerConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub shuttered: ShutteredConfig,
}

/// Busy-indicator behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpinnerConfig {
    #[serde(default = "default_dismiss_delay")]
    pub dismiss_delay: HumanDuration,
    #[serde(default = "default_extend_delay")]
    pub extend_delay: HumanDuration,
    /// Regular expressions; a matching URL never shows the spinner
    #[serde(default)]
    pub suppressed_paths: Vec<String>,
    /// Substrings; a matching URL holds the spinner for `extend_delay`
    #[serde(default)]
    pub extend_delay_paths: Vec<String>,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            dismiss_delay: default_dismiss_delay(),
            extend_delay: default_extend_delay(),
            suppressed_paths: Vec::new(),
            extend_delay_paths: Vec::new(),
        }
    }
}

fn default_dismiss_delay() -> HumanDuration {
    HumanDuration::from_millis(500)
}

fn default_extend_delay() -> HumanDuration {
    HumanDuration::from_secs(3)
}

/// Request assembly defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestConfig {
    #[serde(default = "default_include_anti_fraud_headers")]
    pub include_anti_fraud_headers: bool,
    /// Base for relative request paths
    pub base_url: Option<String>,
    /// Preliminary headers applied to every request
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            include_anti_fraud_headers: default_include_anti_fraud_headers(),
            base_url: None,
            default_headers: BTreeMap::new(),
        }
    }
}

fn default_include_anti_fraud_headers() -> bool {
    true
}

/// reqwest client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("mobilecore/{}", env!("CARGO_PKG_VERSION"))
}

/// Overrides for the maintenance-mode model shown on 503 (and 521 fallback)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShutteredConfig {
    pub title: Option<String>,
    pub message: Option<String>,
}
