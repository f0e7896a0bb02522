//! Anti-fraud header supply
//!
//! The backend scores requests using a fixed set of device/session provenance
//! headers. Collecting the values (screen metrics, local IPs, install id) is
//! the host application's job; this module only defines the header names and
//! the [`FraudPrevention`] seam the request builder pulls them from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::http::HeadersMap;

/// Fixed anti-fraud header names
pub mod header_names {
    pub const DEVICE_ID: &str = "Gov-Client-Device-ID";
    pub const SCREENS: &str = "Gov-Client-Screens";
    pub const WINDOW_SIZE: &str = "Gov-Client-Window-Size";
    pub const TIMEZONE: &str = "Gov-Client-Timezone";
    pub const CONNECTION_METHOD: &str = "Gov-Client-Connection-Method";
    pub const USER_AGENT: &str = "Gov-Client-User-Agent";
    pub const LOCAL_IPS: &str = "Gov-Client-Local-IPs";
    pub const VENDOR_VERSION: &str = "Gov-Vendor-Version";
}

pub const DEFAULT_CONNECTION_METHOD: &str = "MOBILE_APP_DIRECT";

/// Source of anti-fraud headers, consulted on every build
#[async_trait]
pub trait FraudPrevention: Send + Sync {
    async fn prevention_headers(&self) -> HeadersMap;
}

/// Typed anti-fraud header values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiFraudHeaders {
    pub device_id: String,
    pub screens: String,
    pub window_size: String,
    pub timezone: String,
    pub connection_method: String,
    pub user_agent: String,
    pub local_ips: Vec<String>,
    pub vendor_version: String,
}

impl AntiFraudHeaders {
    /// Header map with empty values left out
    pub fn to_headers(&self) -> HeadersMap {
        let local_ips = self.local_ips.join(",");
        [
            (header_names::DEVICE_ID, self.device_id.as_str()),
            (header_names::SCREENS, self.screens.as_str()),
            (header_names::WINDOW_SIZE, self.window_size.as_str()),
            (header_names::TIMEZONE, self.timezone.as_str()),
            (header_names::CONNECTION_METHOD, self.connection_method.as_str()),
            (header_names::USER_AGENT, self.user_agent.as_str()),
            (header_names::LOCAL_IPS, local_ips.as_str()),
            (header_names::VENDOR_VERSION, self.vendor_version.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
    }
}

/// Supplier holding a replaceable snapshot of header values
#[derive(Debug, Default)]
pub struct StaticFraudPrevention {
    headers: RwLock<HeadersMap>,
}

impl StaticFraudPrevention {
    pub fn new(headers: AntiFraudHeaders) -> Self {
        Self::from_map(headers.to_headers())
    }

    pub fn from_map(headers: HeadersMap) -> Self {
        Self {
            headers: RwLock::new(headers),
        }
    }

    pub async fn set_headers(&self, headers: HeadersMap) {
        *self.headers.write().await = headers;
    }
}

#[async_trait]
impl FraudPrevention for StaticFraudPrevention {
    async fn prevention_headers(&self) -> HeadersMap {
        self.headers.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_headers_skips_empty_values() {
        let headers = AntiFraudHeaders {
            device_id: "install-1".to_string(),
            connection_method: DEFAULT_CONNECTION_METHOD.to_string(),
            local_ips: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            ..Default::default()
        }
        .to_headers();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[header_names::DEVICE_ID], "install-1");
        assert_eq!(headers[header_names::LOCAL_IPS], "10.0.0.1,10.0.0.2");
        assert!(!headers.contains_key(header_names::SCREENS));
    }

    #[tokio::test]
    async fn test_static_supplier_can_be_replaced() {
        let supplier = StaticFraudPrevention::default();
        assert!(supplier.prevention_headers().await.is_empty());

        let mut replacement = HeadersMap::new();
        replacement.insert(header_names::TIMEZONE.to_string(), "UTC+01:00".to_string());
        supplier.set_headers(replacement).await;

        let headers = supplier.prevention_headers().await;
        assert_eq!(headers[header_names::TIMEZONE], "UTC+01:00");
    }
}
