//! Server configuration
//!
//! All settings come from environment variables (optionally via a `.env`
//! file loaded at startup).
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | HTTP_PORT | 5000 | Driver API port |
//! | DATABASE_URL | — | PostgreSQL connection string; presence selects the networked backend |
//! | DATABASE_PATH | courier.db | SQLite file used when DATABASE_URL is absent |
//! | DATA_MODE | local | demo \| local \| live |
//! | WMS_CLUSTER | — | `.wms` cluster name (forms the base URL) |
//! | WMS_INSTANCE_CODE | — | `.wms` instance code |
//! | WMS_TENANT_CODE | — | `.wms` tenant code |
//! | WMS_WAREHOUSE_CODE | — | optional warehouse code |
//! | WMS_API_KEY | — | `.wms` API key |
//! | REQUEST_TIMEOUT_SECS | 30 | outbound WMS call timeout |

use crate::sync::SyncMode;
use crate::wms::WmsConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Driver API port
    pub http_port: u16,
    /// PostgreSQL connection string; `Some` selects the networked backend
    pub database_url: Option<String>,
    /// SQLite file path used by the embedded backend
    pub database_path: String,
    /// Configured operating mode (a per-session override may still apply)
    pub data_mode: SyncMode,
    /// External WMS credentials
    pub wms: WmsConfig,
    /// Timeout for outbound WMS calls (seconds)
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let wms = WmsConfig {
            cluster: env_string("WMS_CLUSTER"),
            instance_code: env_string("WMS_INSTANCE_CODE"),
            tenant_code: env_string("WMS_TENANT_CODE"),
            warehouse_code: env_string("WMS_WAREHOUSE_CODE"),
            api_key: env_string("WMS_API_KEY"),
        };

        let requested_mode = std::env::var("DATA_MODE")
            .ok()
            .and_then(|m| SyncMode::parse(&m))
            .unwrap_or(SyncMode::Local);

        // Live mode needs working WMS credentials; otherwise degrade to
        // local so mutations still persist.
        let data_mode = if requested_mode == SyncMode::Live && !wms.is_configured() {
            tracing::warn!("DATA_MODE=live but WMS is not configured, falling back to local");
            SyncMode::Local
        } else {
            requested_mode
        };

        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "courier.db".into()),
            data_mode,
            wms,
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
        }
    }
}

fn env_string(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}
