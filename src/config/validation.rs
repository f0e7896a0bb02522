use super::models::Config;
use regex::Regex;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Suppressed spinner path '{pattern}' is not a valid regex: {reason}")]
    InvalidSpinnerPattern { pattern: String, reason: String },

    #[error("Transport timeout must be positive: {field}")]
    ZeroTimeout { field: String },

    #[error("Base URL '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Shuttered override '{field}' must not be empty")]
    EmptyShutteredField { field: String },

    #[error("Default header name must not be empty")]
    EmptyHeaderName,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_spinner(config)?;
    validate_request(config)?;
    validate_transport(config)?;
    validate_shuttered(config)?;
    Ok(())
}

/// Every suppressed path must compile; extend paths are plain substrings
fn validate_spinner(config: &Config) -> Result<(), ValidationError> {
    for pattern in &config.spinner.suppressed_paths {
        if let Err(e) = Regex::new(pattern) {
            return Err(ValidationError::InvalidSpinnerPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_request(config: &Config) -> Result<(), ValidationError> {
    if let Some(ref base_url) = config.request.base_url {
        if let Err(e) = Url::parse(base_url) {
            return Err(ValidationError::InvalidBaseUrl {
                url: base_url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config
        .request
        .default_headers
        .keys()
        .any(|name| name.trim().is_empty())
    {
        return Err(ValidationError::EmptyHeaderName);
    }

    Ok(())
}

fn validate_transport(config: &Config) -> Result<(), ValidationError> {
    if config.transport.connect_timeout.as_duration().is_zero() {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout".to_string(),
        });
    }

    if config.transport.request_timeout.as_duration().is_zero() {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout".to_string(),
        });
    }

    Ok(())
}

fn validate_shuttered(config: &Config) -> Result<(), ValidationError> {
    let fields = [
        ("title", &config.shuttered.title),
        ("message", &config.shuttered.message),
    ];
    for (field, value) in fields {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ValidationError::EmptyShutteredField {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
