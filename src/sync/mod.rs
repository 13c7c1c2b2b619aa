//! Sync orchestration
//!
//! The one place where a mutating use case is wired to zero or one
//! outbound gateway push, exactly one local persist, and exactly one
//! audit record. Creation is locally authoritative (persist even when
//! the push fails); cancellation is externally authoritative (do not
//! record locally unless the remote side confirmed).

mod demo;
mod service;

pub use service::SyncService;

use serde::Serialize;
use serde_json::Value;

use crate::wms::WmsOutcome;

/// Operating mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Synthetic reads, no store, no gateway.
    Demo,
    /// Store only.
    Local,
    /// Store plus gateway pushes.
    Live,
}

impl SyncMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" => Some(Self::Demo),
            "local" => Some(Self::Local),
            "live" => Some(Self::Live),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Local => "local",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResult {
    pub success: bool,
    pub order_id: String,
    pub tracking_number: String,
    pub wms_pushed: bool,
    pub mock: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDriverResult {
    pub success: bool,
    pub driver_id: String,
    pub mock: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunResult {
    pub success: bool,
    pub run_id: String,
    pub mock: bool,
}

/// Acknowledgement for create-style operations with no generated id.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAck {
    pub success: bool,
    pub wms_pushed: bool,
    pub mock: bool,
}

/// Result of a cancel-style operation. `success: false` means the
/// authoritative system refused and nothing changed locally.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResult {
    pub success: bool,
    pub mock: bool,
    pub error: Option<String>,
}

impl CancelResult {
    fn ok(mock: bool) -> Self {
        Self { success: true, mock, error: None }
    }

    fn refused(outcome: &WmsOutcome) -> Self {
        Self {
            success: false,
            mock: false,
            error: outcome.error.clone(),
        }
    }
}

/// Result of a live-only passthrough (stock, ULD, kitting). Outside
/// live mode these report a mock success without side effects.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResult {
    pub success: bool,
    pub mock: bool,
    pub status_code: Option<i64>,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl GatewayResult {
    fn mock() -> Self {
        Self {
            success: true,
            mock: true,
            status_code: None,
            response: None,
            error: None,
        }
    }

    fn unconfigured() -> Self {
        Self {
            success: false,
            mock: true,
            status_code: None,
            response: None,
            error: Some("WMS not configured".into()),
        }
    }
}

impl From<WmsOutcome> for GatewayResult {
    fn from(outcome: WmsOutcome) -> Self {
        Self {
            success: outcome.success,
            mock: false,
            status_code: outcome.status_code,
            response: outcome.response,
            error: outcome.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(SyncMode::parse("Live"), Some(SyncMode::Live));
        assert_eq!(SyncMode::parse(" demo "), Some(SyncMode::Demo));
        assert_eq!(SyncMode::parse("local"), Some(SyncMode::Local));
        assert_eq!(SyncMode::parse("offline"), None);
    }
}
