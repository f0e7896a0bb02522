use bytes::Bytes;
use thiserror::Error;
use url::form_urlencoded;

use super::query::{add_query_pairs, parameter_value};
use super::types::{HttpRequest, Parameters};

/// Content types the builder recognises
pub mod content_type {
    pub const HEADER: &str = "Content-Type";
    pub const JSON: &str = "application/json";
    pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// How body parameters are attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterEncoding {
    /// Query string parameters, appended after any existing ones
    Url,
    /// JSON object body
    Json,
    /// `application/x-www-form-urlencoded` body
    Form,
}

impl ParameterEncoding {
    /// Pick the encoding for a POST/PUT body from its declared content type
    ///
    /// Parameters on a declared type that is neither JSON nor form fall back
    /// to query encoding.
    pub fn for_content_type(declared: &str) -> Self {
        let essence = declared
            .parse::<mime::Mime>()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_else(|_| declared.trim().to_ascii_lowercase());

        match essence.as_str() {
            content_type::JSON => ParameterEncoding::Json,
            content_type::FORM_URL_ENCODED => ParameterEncoding::Form,
            _ => ParameterEncoding::Url,
        }
    }

    pub fn encode(
        self,
        mut request: HttpRequest,
        parameters: &Parameters,
    ) -> Result<HttpRequest, EncodingError> {
        match self {
            ParameterEncoding::Url => {
                add_query_pairs(
                    &mut request.url,
                    parameters
                        .iter()
                        .map(|(name, value)| (name.as_str(), parameter_value(value))),
                );
            }
            ParameterEncoding::Json => {
                let body = serde_json::to_vec(parameters)?;
                request.body = Some(Bytes::from(body));
            }
            ParameterEncoding::Form => {
                let body = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(
                        parameters
                            .iter()
                            .map(|(name, value)| (name.as_str(), parameter_value(value))),
                    )
                    .finish();
                request.body = Some(Bytes::from(body));
            }
        }
        Ok(request)
    }
}
