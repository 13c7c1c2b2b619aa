//! Warehouse-management-system gateway
//!
//! Transport only: the gateway takes an operation name and a ready-made
//! JSON payload, injects credentials, and reports what the remote side
//! said. Failures are data (`WmsOutcome`), not errors; callers decide
//! what a failed push means for local state.

mod client;

pub use client::WmsClient;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Connection settings for a .wms tenant. Credentials ride in the request
/// body, not in headers.
#[derive(Debug, Clone, Default)]
pub struct WmsConfig {
    /// Subdomain of the hosted instance, e.g. `au1`.
    pub cluster: String,
    pub instance_code: String,
    pub tenant_code: String,
    pub warehouse_code: String,
    pub api_key: String,
}

impl WmsConfig {
    pub fn is_configured(&self) -> bool {
        !self.cluster.is_empty()
            && !self.instance_code.is_empty()
            && !self.tenant_code.is_empty()
            && !self.api_key.is_empty()
    }

    pub fn base_url(&self) -> String {
        format!("https://{}.dotwms.com/api/1.0", self.cluster)
    }
}

/// Result of one outbound gateway call. `success: false` is an expected
/// outcome, never an `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct WmsOutcome {
    pub success: bool,
    pub status_code: Option<i64>,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl WmsOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: None,
            response: None,
            error: Some(error.into()),
        }
    }

    /// Response body rendered for the audit trail.
    pub fn response_text(&self) -> Option<String> {
        self.response.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[async_trait]
pub trait WmsGateway: Send + Sync {
    /// POST `payload` (with credentials injected) to the named operation.
    async fn post(&self, operation: &str, payload: Value) -> WmsOutcome;

    /// Reachability probe. The remote API has no health endpoint, so any
    /// HTTP answer from the base URL counts as reachable.
    async fn test_connection(&self) -> WmsOutcome;
}
