//! Configuration management for mobilecore
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use mobilecore::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Spinner dismiss delay: {}", config.spinner.dismiss_delay);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MOBILECORE__<section>__<key>`
//!
//! Examples:
//! - `MOBILECORE__SPINNER__DISMISS_DELAY=250ms`
//! - `MOBILECORE__REQUEST__INCLUDE_ANTI_FRAUD_HEADERS=false`
//! - `MOBILECORE__TRANSPORT__REQUEST_TIMEOUT=30s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/mobilecore.toml`.
//! This can be overridden using the `MOBILECORE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, RequestConfig, ShutteredConfig, SpinnerConfig, TransportConfig};
pub use validation::ValidationError;

use thiserror::Error;

use crate::network::ShutteredModel;
use crate::spinner::SpinnerPolicy;
use crate::transport::HttpConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Invalid spinner pattern: {0}")]
    PatternError(#[from] regex::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`MOBILECORE__*`)
    /// 2. TOML file (default: `config/mobilecore.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad regex, zero timeout, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Compile the `[spinner]` section
    pub fn spinner_policy(&self) -> Result<SpinnerPolicy, ConfigError> {
        let spinner = &self.spinner;
        Ok(SpinnerPolicy::new(
            &spinner.suppressed_paths,
            spinner.extend_delay_paths.iter().cloned(),
            spinner.dismiss_delay.as_duration(),
            spinner.extend_delay.as_duration(),
        )?)
    }

    /// Default maintenance model with `[shuttered]` overrides applied
    pub fn shuttered_model(&self) -> ShutteredModel {
        let fallback = ShutteredModel::default();
        ShutteredModel::new(
            self.shuttered.title.clone().unwrap_or_default(),
            self.shuttered.message.clone().unwrap_or_default(),
        )
        .or_fallback(&fallback)
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.transport.connect_timeout.as_duration(),
            request_timeout: self.transport.request_timeout.as_duration(),
            user_agent: self.transport.user_agent.clone(),
        }
    }
}
