use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::encoding::{EncodingError, ParameterEncoding, content_type};
use super::hooks::{DefaultHooks, RequestHooks};
use super::types::{HeadersMap, HttpRequest, Method, Parameters, merge_headers};
use crate::fraud::FraudPrevention;
use crate::network::{ErrorCause, ErrorDomain, ServiceError};

/// Final caller-supplied edit applied to the built request
pub type RequestModifier = Arc<dyn Fn(HttpRequest) -> HttpRequest + Send + Sync>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("header supplier failed: {0}")]
    HeaderSupplier(String),

    #[error("parameter encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("request build panicked: {0}")]
    Panicked(String),

    /// A hook that already knows the service-level outcome (e.g. logout)
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl BuildError {
    /// Build failures surface as `Unrecoverable` unless already classified
    pub fn into_service_error(self) -> ServiceError {
        match self {
            BuildError::Service(error) => error,
            other => ServiceError::Unrecoverable(ErrorCause::new(
                ErrorDomain::Build,
                0,
                other.to_string(),
            )),
        }
    }
}

/// One-shot asynchronous request assembly
///
/// Method and URL are fixed when the builder is created; headers and body
/// parameters are layered on top before `build()`.
#[derive(Clone)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    parameters: Option<Parameters>,
    headers: HeadersMap,
    preliminary_headers: HeadersMap,
    include_anti_fraud_headers: bool,
    hooks: Arc<dyn RequestHooks>,
    fraud_prevention: Option<Arc<dyn FraudPrevention>>,
    modify_request: Option<RequestModifier>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            parameters: None,
            headers: HeadersMap::new(),
            preliminary_headers: HeadersMap::new(),
            include_anti_fraud_headers: true,
            hooks: Arc::new(DefaultHooks),
            fraud_prevention: None,
            modify_request: None,
        }
    }

    /// Resolve `path` against `base` the way a browser resolves a relative link
    pub fn relative(base: &Url, path: &str) -> Self {
        let url = base
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| path.to_string());
        Self::new(url)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Parse a JSON object body into parameters; anything else clears them
    pub fn json_body(mut self, data: &[u8]) -> Self {
        self.parameters = serde_json::from_slice::<serde_json::Value>(data)
            .ok()
            .and_then(|value| value.as_object().cloned());
        self
    }

    pub fn headers(mut self, headers: HeadersMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set one explicit header, replacing any differently-cased duplicate
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut header = HeadersMap::new();
        header.insert(name.into(), value.into());
        merge_headers(&mut self.headers, header);
        self
    }

    /// Lowest-precedence headers, overridden by everything else
    pub fn preliminary_headers(mut self, headers: HeadersMap) -> Self {
        self.preliminary_headers = headers;
        self
    }

    pub fn include_anti_fraud_headers(mut self, include: bool) -> Self {
        self.include_anti_fraud_headers = include;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn RequestHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn fraud_prevention(mut self, supplier: Arc<dyn FraudPrevention>) -> Self {
        self.fraud_prevention = Some(supplier);
        self
    }

    pub fn modify_request<F>(mut self, modifier: F) -> Self
    where
        F: Fn(HttpRequest) -> HttpRequest + Send + Sync + 'static,
    {
        self.modify_request = Some(Arc::new(modifier));
        self
    }

    pub fn http_method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_fraud_prevention(&self) -> bool {
        self.fraud_prevention.is_some()
    }

    pub fn has_preliminary_headers(&self) -> bool {
        !self.preliminary_headers.is_empty()
    }

    pub fn anti_fraud_headers_enabled(&self) -> bool {
        self.include_anti_fraud_headers
    }

    /// Assemble the final request
    ///
    /// Fails if the URL does not parse, the header hook fails, or the body
    /// parameters cannot be encoded. Never retries.
    pub async fn build(&self) -> Result<HttpRequest, BuildError> {
        let url = Url::parse(&self.url).map_err(|e| BuildError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        let url = self.hooks.modify_url(url);
        let mut request = HttpRequest::new(self.method, url);

        let mut headers = self.preliminary_headers.clone();
        merge_headers(&mut headers, self.headers.clone());

        if self.include_anti_fraud_headers {
            if let Some(supplier) = &self.fraud_prevention {
                merge_headers(&mut headers, supplier.prevention_headers().await);
            }
        }

        request.cache_policy = self.hooks.cache_policy().await;

        let additional = self.hooks.additional_headers().await?;
        merge_headers(&mut headers, additional);
        request.headers = headers;

        if let Some(parameters) = &self.parameters {
            request = encode_parameters(request, parameters)?;
        }

        if let Some(modifier) = &self.modify_request {
            request = modifier(request);
        }

        debug!(
            method = %request.method,
            url = %request.url,
            headers = request.headers.len(),
            has_body = request.body.is_some(),
            "Request built"
        );

        Ok(request)
    }
}

fn encode_parameters(
    mut request: HttpRequest,
    parameters: &Parameters,
) -> Result<HttpRequest, EncodingError> {
    match request.method {
        Method::Get => ParameterEncoding::Url.encode(request, parameters),
        Method::Post | Method::Put => {
            let encoding = match request.header(content_type::HEADER) {
                Some(declared) => ParameterEncoding::for_content_type(declared),
                None => {
                    request.set_header(content_type::HEADER, content_type::JSON);
                    ParameterEncoding::Json
                }
            };
            encoding.encode(request, parameters)
        }
        Method::Delete => Ok(request),
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("parameters", &self.parameters)
            .field("headers", &self.headers)
            .field("include_anti_fraud_headers", &self.include_anti_fraud_headers)
            .finish_non_exhaustive()
    }
}
