use async_trait::async_trait;
use url::Url;

use super::builder::BuildError;
use super::query::{add_query_pairs, has_query_key};
use super::types::{CachePolicy, HeadersMap};

/// Customisation points invoked by [`RequestBuilder::build`](super::RequestBuilder::build)
///
/// Every method has a pass-through default, so implementors only override
/// what they need (for example an auth layer supplying `additional_headers`).
#[async_trait]
pub trait RequestHooks: Send + Sync {
    /// Rewrite the URL before anything else happens
    fn modify_url(&self, url: Url) -> Url {
        url
    }

    /// Headers with the highest precedence; may suspend (token refresh etc.)
    async fn additional_headers(&self) -> Result<HeadersMap, BuildError> {
        Ok(HeadersMap::new())
    }

    async fn cache_policy(&self) -> CachePolicy {
        CachePolicy::UseProtocolCachePolicy
    }
}

/// Hooks that change nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl RequestHooks for DefaultHooks {}

/// Appends a tracking query parameter unless the URL already carries it
///
/// Safe to run on every retry of the same request.
#[derive(Debug, Clone)]
pub struct TrackingQueryHooks {
    key: String,
    value: String,
}

impl TrackingQueryHooks {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl RequestHooks for TrackingQueryHooks {
    fn modify_url(&self, mut url: Url) -> Url {
        if !has_query_key(&url, &self.key) {
            add_query_pairs(&mut url, [(&self.key, &self.value)]);
        }
        url
    }
}
