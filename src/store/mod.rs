//! Entity store
//!
//! One persistence contract, two backends: an embedded SQLite file for
//! single-box deployments and a networked PostgreSQL store for hosted ones.
//! `DATABASE_URL` in the environment selects PostgreSQL; its absence selects
//! SQLite. Selection happens once per process.
//!
//! Everything above this module is backend-agnostic: callers hold an
//! `Arc<dyn EntityStore>` and never see which implementation is behind it.

pub mod models;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::Config;
use models::{
    AdminUser, ApiLogEntry, ApiLogRecord, Driver, DriverCreate, DriverToken, Item, Order,
    OrderPatch, Receipt, Run, SessionToken, Zone,
};

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD contract implemented identically by both backends.
///
/// Reads return owned snapshots; nothing in here caches. Token expiry is
/// deliberately NOT evaluated here — the Token Authority owns the clock.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // === Orders ===

    /// Upsert keyed by order_id: replays of the same id overwrite fields,
    /// never duplicate rows.
    async fn save_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_orders(&self) -> StoreResult<Vec<Order>>;
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>>;
    async fn get_order_by_tracking(&self, tracking: &str) -> StoreResult<Option<Order>>;
    async fn tracking_number_exists(&self, tracking: &str) -> StoreResult<bool>;
    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        driver: Option<&str>,
    ) -> StoreResult<()>;
    async fn update_order_fields(&self, order_id: &str, patch: &OrderPatch) -> StoreResult<()>;

    // === Drivers ===

    async fn save_driver(&self, driver: &Driver) -> StoreResult<()>;
    async fn update_driver(&self, driver_id: &str, data: &DriverCreate) -> StoreResult<()>;
    async fn delete_driver(&self, driver_id: &str) -> StoreResult<()>;
    /// Roster read: every driver with `active_orders`, `deliveries_today`,
    /// and `success_rate` recomputed by a single aggregate query.
    async fn get_drivers(&self) -> StoreResult<Vec<Driver>>;
    async fn get_driver(&self, driver_id: &str) -> StoreResult<Option<Driver>>;
    async fn find_driver_by_phone(&self, phone: &str) -> StoreResult<Option<Driver>>;
    async fn update_driver_location(
        &self,
        driver_id: &str,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    // === Runs ===

    /// Create a run, its stop sequence, and the per-order allocation
    /// cascade in ONE transaction: a crash can never leave a run with
    /// only some member orders allocated.
    async fn create_run_with_orders(&self, run: &Run, order_ids: &[String]) -> StoreResult<()>;
    async fn get_runs(&self) -> StoreResult<Vec<Run>>;
    async fn get_run(&self, run_id: &str) -> StoreResult<Option<Run>>;
    async fn update_run_status(&self, run_id: &str, status: &str) -> StoreResult<()>;
    /// Set progress, clamped so `completed` never exceeds `total_stops`.
    async fn update_run_progress(&self, run_id: &str, completed: i64) -> StoreResult<()>;
    /// Count runs created on the given calendar date (YYYY-MM-DD); feeds
    /// run id generation.
    async fn count_runs_today(&self, today: &str) -> StoreResult<i64>;
    /// Member orders of a run, ordered by stop sequence.
    async fn get_run_orders(&self, run_id: &str) -> StoreResult<Vec<Order>>;

    // === Zones ===

    async fn get_zones(&self) -> StoreResult<Vec<Zone>>;
    async fn save_zone(&self, zone: &Zone) -> StoreResult<()>;
    async fn delete_zone(&self, zone_name: &str) -> StoreResult<()>;
    /// Insert the default zone set, only when the table is empty.
    async fn seed_default_zones(&self) -> StoreResult<()>;

    // === Settings ===

    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn get_all_settings(&self) -> StoreResult<Vec<(String, String)>>;

    // === Admin users ===

    async fn create_admin_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
    ) -> StoreResult<()>;
    /// Username lookup is case-insensitive.
    async fn get_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>>;
    async fn admin_user_count(&self) -> StoreResult<i64>;

    // === Session tokens (admin) ===

    async fn create_session_token(&self, token: &SessionToken) -> StoreResult<()>;
    async fn get_session_token(&self, token: &str) -> StoreResult<Option<SessionToken>>;
    async fn delete_session_token(&self, token: &str) -> StoreResult<()>;
    async fn purge_expired_session_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    // === Driver tokens ===

    async fn create_driver_token(&self, token: &DriverToken) -> StoreResult<()>;
    async fn get_driver_token(&self, token: &str) -> StoreResult<Option<DriverToken>>;
    async fn delete_driver_token(&self, token: &str) -> StoreResult<()>;
    async fn purge_expired_driver_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    // === API log ===

    async fn append_api_log(&self, record: &ApiLogRecord) -> StoreResult<()>;
    /// Most recent `limit` entries, newest first.
    async fn recent_api_log(&self, limit: i64) -> StoreResult<Vec<ApiLogEntry>>;
    async fn clear_api_log(&self) -> StoreResult<()>;

    // === Receipts ===

    async fn save_receipt(&self, receipt: &Receipt) -> StoreResult<()>;
    async fn get_receipts(&self) -> StoreResult<Vec<Receipt>>;

    // === Items ===

    async fn save_item(&self, item: &Item) -> StoreResult<()>;
    async fn delete_item(&self, item_code: &str) -> StoreResult<()>;
    async fn get_items(&self) -> StoreResult<Vec<Item>>;
}

/// Open the durable store selected by configuration.
///
/// A `DATABASE_URL` selects the networked PostgreSQL backend; otherwise the
/// embedded SQLite file at `database_path` is used.
pub async fn open_store(config: &Config) -> StoreResult<Arc<dyn EntityStore>> {
    match &config.database_url {
        Some(url) => {
            let store = postgres::PostgresStore::connect(url).await?;
            tracing::info!("Using PostgreSQL store");
            Ok(Arc::new(store))
        }
        None => {
            let store = sqlite::SqliteStore::open(&config.database_path).await?;
            tracing::info!(path = %config.database_path, "Using SQLite store");
            Ok(Arc::new(store))
        }
    }
}
