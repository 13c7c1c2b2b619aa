use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::error::{AppError, Result};

use super::{WmsConfig, WmsGateway, WmsOutcome};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed gateway. All operations are POSTs with JSON bodies;
/// field order in the body is significant, so payloads are built as
/// insertion-ordered maps.
pub struct WmsClient {
    config: WmsConfig,
    http: reqwest::Client,
    timeout: Duration,
}

impl WmsClient {
    pub fn new(config: WmsConfig, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http, timeout })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}/", self.config.base_url(), operation)
    }
}

/// Credentials go at the head of the body, before the operation fields.
fn build_payload(config: &WmsConfig, data: Value) -> Value {
    let mut merged = Map::new();
    merged.insert("InstanceCode".into(), Value::String(config.instance_code.clone()));
    merged.insert("TenantCode".into(), Value::String(config.tenant_code.clone()));
    if !config.warehouse_code.is_empty() {
        merged.insert("WarehouseCode".into(), Value::String(config.warehouse_code.clone()));
    }
    merged.insert("APIKey".into(), Value::String(config.api_key.clone()));

    match data {
        Value::Object(fields) => {
            for (k, v) in fields {
                merged.insert(k, v);
            }
        }
        Value::Null => {}
        other => {
            merged.insert("Data".into(), other);
        }
    }
    Value::Object(merged)
}

#[async_trait]
impl WmsGateway for WmsClient {
    async fn post(&self, operation: &str, payload: Value) -> WmsOutcome {
        let url = self.endpoint(operation);
        let body = build_payload(&self.config, payload);

        let sent = self.http.post(&url).json(&body).send().await;

        let response = match sent {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return WmsOutcome::failure(format!(
                    "Request timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
            Err(e) if e.is_connect() => {
                return WmsOutcome::failure(format!(
                    "Connection failed: could not reach {url}. Check the cluster name."
                ));
            }
            Err(e) => return WmsOutcome::failure(format!("Request failed: {e}")),
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        // remote sometimes answers with non-JSON bodies on errors
        let parsed = serde_json::from_str::<Value>(&text)
            .unwrap_or_else(|_| Value::String(text.clone()));

        let error = if status.is_success() {
            None
        } else {
            let snippet: String = text.chars().take(500).collect();
            Some(format!("HTTP {}: {snippet}", status.as_u16()))
        };

        WmsOutcome {
            success: status.is_success(),
            status_code: Some(status.as_u16() as i64),
            response: Some(parsed),
            error,
        }
    }

    async fn test_connection(&self) -> WmsOutcome {
        let url = format!("{}/", self.config.base_url());
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => WmsOutcome {
                success: true,
                status_code: Some(resp.status().as_u16() as i64),
                response: Some(Value::String(format!(
                    "Endpoint reachable (HTTP {})",
                    resp.status().as_u16()
                ))),
                error: None,
            },
            Err(e) if e.is_timeout() => WmsOutcome::failure("Connection timed out"),
            Err(e) if e.is_connect() => WmsOutcome::failure(format!(
                "Cannot reach {}. Check the cluster name.",
                self.config.base_url()
            )),
            Err(e) => WmsOutcome::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> WmsConfig {
        WmsConfig {
            cluster: "au1".into(),
            instance_code: "INST".into(),
            tenant_code: "TEN".into(),
            warehouse_code: "WH1".into(),
            api_key: "secret".into(),
        }
    }

    #[test]
    fn auth_fields_lead_the_payload_in_order() {
        let body = build_payload(&config(), json!({"OrderNumber": "SMC-12345"}));
        let rendered = serde_json::to_string(&body).unwrap();
        assert_eq!(
            rendered,
            r#"{"InstanceCode":"INST","TenantCode":"TEN","WarehouseCode":"WH1","APIKey":"secret","OrderNumber":"SMC-12345"}"#
        );
    }

    #[test]
    fn empty_warehouse_code_is_omitted() {
        let mut cfg = config();
        cfg.warehouse_code.clear();
        let body = build_payload(&cfg, json!({}));
        assert!(body.get("WarehouseCode").is_none());
        assert!(body.get("APIKey").is_some());
    }

    #[test]
    fn client_carries_the_configured_timeout() {
        let client = WmsClient::new(config(), 5).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn base_url_derives_from_cluster() {
        assert_eq!(config().base_url(), "https://au1.dotwms.com/api/1.0");
    }

    #[test]
    fn unconfigured_when_api_key_missing() {
        let mut cfg = config();
        cfg.api_key.clear();
        assert!(!cfg.is_configured());
    }
}
