//! Request construction for the network pipeline
//!
//! A [`RequestBuilder`] collects the caller's method, URL, body parameters and
//! headers, then `build()` turns them into an immutable [`HttpRequest`] ready
//! for a [`Transport`](crate::transport::Transport).
//!
//! ## Build steps
//!
//! 1. URL rewrite hook ([`RequestHooks::modify_url`])
//! 2. Header merge: hook headers and anti-fraud headers > explicit headers >
//!    preliminary headers
//! 3. Cache policy hook ([`RequestHooks::cache_policy`])
//! 4. Parameter encoding chosen by method and `Content-Type`
//! 5. Final request modifier
//!
//! ## Example
//!
//! ```rust,ignore
//! use mobilecore::http::{Method, RequestBuilder};
//! use serde_json::json;
//!
//! let builder = RequestBuilder::new("https://api.example.com/items?page=1")
//!     .method(Method::Get)
//!     .parameters(json!({"size": 20}).as_object().cloned().unwrap());
//!
//! let request = builder.build().await?;
//! assert!(request.url.as_str().contains("size=20"));
//! ```

mod builder;
mod encoding;
mod hooks;
pub mod query;
mod types;

pub use builder::{BuildError, RequestBuilder, RequestModifier};
pub use encoding::{EncodingError, ParameterEncoding, content_type};
pub use hooks::{DefaultHooks, RequestHooks, TrackingQueryHooks};
pub use types::{
    CachePolicy, HeadersMap, HttpRequest, Method, ParseMethodError, Parameters, Response,
    merge_headers,
};
