//! Embedded SQLite backend
//!
//! Single-file store opened in WAL mode so concurrent readers tolerate the
//! single writer. Schema is created on open and then brought up to date by
//! additive, idempotent column migrations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

use async_trait::async_trait;

use super::models::{
    AdminUser, ApiLogEntry, ApiLogRecord, DEFAULT_ZONES, Driver, DriverCreate, DriverToken, Item,
    Order, OrderPatch, Receipt, Run, SessionToken, Zone,
};
use super::{EntityStore, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    order_id TEXT PRIMARY KEY,
    customer TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    address TEXT NOT NULL,
    suburb TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'NSW',
    postcode TEXT NOT NULL,
    service_level TEXT NOT NULL DEFAULT 'standard',
    parcels INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'pending',
    driver_id TEXT,
    special_instructions TEXT,
    pushed_to_wms INTEGER NOT NULL DEFAULT 0,
    wms_response TEXT,
    order_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS drivers (
    driver_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    vehicle_type TEXT NOT NULL DEFAULT 'Van',
    plate TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'available',
    current_zone TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL UNIQUE,
    deliveries_today INTEGER NOT NULL DEFAULT 0,
    success_rate REAL NOT NULL DEFAULT 0.95,
    rating REAL NOT NULL DEFAULT 4.5,
    active_orders INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    zone TEXT NOT NULL DEFAULT '',
    driver_id TEXT NOT NULL DEFAULT '',
    driver_name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    total_stops INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS run_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    order_id TEXT NOT NULL,
    stop_sequence INTEGER NOT NULL,
    FOREIGN KEY (run_id) REFERENCES runs(run_id),
    FOREIGN KEY (order_id) REFERENCES orders(order_id)
);

CREATE TABLE IF NOT EXISTS zones (
    zone_name TEXT PRIMARY KEY,
    suburbs TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admin_users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_tokens (
    token TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS driver_tokens (
    token TEXT PRIMARY KEY,
    driver_id TEXT NOT NULL,
    phone TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    operation TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    request_summary TEXT NOT NULL,
    success INTEGER NOT NULL,
    status_code INTEGER,
    response_body TEXT,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS receipts (
    shipment_number TEXT PRIMARY KEY,
    supplier_name TEXT NOT NULL DEFAULT '',
    receipt_reference TEXT NOT NULL DEFAULT '',
    container_type TEXT NOT NULL DEFAULT '',
    due_date TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    lines_json TEXT NOT NULL DEFAULT '[]',
    pushed_to_wms INTEGER NOT NULL DEFAULT 0,
    wms_response TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    item_code TEXT PRIMARY KEY,
    item_name TEXT NOT NULL DEFAULT '',
    item_group TEXT NOT NULL DEFAULT '',
    barcode TEXT NOT NULL DEFAULT '',
    weight REAL,
    length REAL,
    width REAL,
    height REAL,
    unit_of_measure TEXT NOT NULL DEFAULT 'EA',
    inner_qty INTEGER,
    outer_qty INTEGER,
    pallet_qty INTEGER,
    pushed_to_wms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_driver_id ON orders(driver_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_run_orders_run_id ON run_orders(run_id);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
CREATE INDEX IF NOT EXISTS idx_session_tokens_expires_at ON session_tokens(expires_at);
CREATE INDEX IF NOT EXISTS idx_driver_tokens_expires_at ON driver_tokens(expires_at);
"#;

/// Columns added after the initial schema shipped. Applied one at a time;
/// a failure on one column (already present) never blocks the rest.
const ORDER_MIGRATIONS: &[(&str, &str)] = &[
    ("tracking_number", "TEXT"),
    ("zone", "TEXT"),
    ("proof_photo", "TEXT"),
    ("proof_signature", "TEXT"),
    ("delivery_notes", "TEXT"),
    ("delivered_at", "TEXT"),
];

const DRIVER_MIGRATIONS: &[(&str, &str)] = &[
    ("latitude", "REAL"),
    ("longitude", "REAL"),
    ("location_updated_at", "TEXT"),
];

/// Embedded single-file store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path`, apply schema and
    /// additive migrations.
    pub async fn open(path: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
            .map_err(|e| StoreError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to open database: {e}")))?;

        // wait up to 5s on write contention instead of failing immediately
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        let store = Self { pool };
        store.migrate().await;

        tracing::info!("SQLite store ready (WAL, busy_timeout=5000ms)");
        Ok(store)
    }

    /// Additive, idempotent column migrations. Each ALTER runs on its own;
    /// the expected failure (column already exists) is logged and skipped.
    async fn migrate(&self) {
        for (table, cols) in [("orders", ORDER_MIGRATIONS), ("drivers", DRIVER_MIGRATIONS)] {
            for (col, col_type) in cols {
                let sql = format!("ALTER TABLE {table} ADD COLUMN {col} {col_type}");
                if let Err(e) = sqlx::query(&sql).execute(&self.pool).await {
                    tracing::debug!(table, col, "Migration skipped: {e}");
                }
            }
        }

        if let Err(e) =
            sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_tracking_number ON orders(tracking_number)")
                .execute(&self.pool)
                .await
        {
            tracing::warn!("Failed to create tracking_number index: {e}");
        }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    // === Orders ===

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        // tracking_number, order_date, and created_at are write-once:
        // the conflict branch deliberately leaves them untouched.
        sqlx::query(
            r#"INSERT INTO orders
               (order_id, tracking_number, customer, email, phone, address, suburb, state,
                postcode, zone, service_level, parcels, status, driver_id, special_instructions,
                proof_photo, proof_signature, delivery_notes, delivered_at,
                pushed_to_wms, wms_response, order_date, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(order_id) DO UPDATE SET
                   customer = excluded.customer,
                   email = excluded.email,
                   phone = excluded.phone,
                   address = excluded.address,
                   suburb = excluded.suburb,
                   state = excluded.state,
                   postcode = excluded.postcode,
                   zone = excluded.zone,
                   service_level = excluded.service_level,
                   parcels = excluded.parcels,
                   status = excluded.status,
                   driver_id = excluded.driver_id,
                   special_instructions = excluded.special_instructions,
                   pushed_to_wms = excluded.pushed_to_wms,
                   wms_response = excluded.wms_response,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&order.order_id)
        .bind(&order.tracking_number)
        .bind(&order.customer)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(&order.suburb)
        .bind(&order.state)
        .bind(&order.postcode)
        .bind(&order.zone)
        .bind(&order.service_level)
        .bind(order.parcels)
        .bind(&order.status)
        .bind(&order.driver_id)
        .bind(&order.special_instructions)
        .bind(&order.proof_photo)
        .bind(&order.proof_signature)
        .bind(&order.delivery_notes)
        .bind(order.delivered_at)
        .bind(order.pushed_to_wms)
        .bind(&order.wms_response)
        .bind(&order.order_date)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_orders(&self) -> StoreResult<Vec<Order>> {
        let orders =
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(orders)
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn get_order_by_tracking(&self, tracking: &str) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE tracking_number = ?")
            .bind(tracking)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn tracking_number_exists(&self, tracking: &str) -> StoreResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE tracking_number = ?")
                .bind(tracking)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        driver: Option<&str>,
    ) -> StoreResult<()> {
        let rows = sqlx::query(
            "UPDATE orders SET status = ?, driver_id = COALESCE(?, driver_id), updated_at = ? \
             WHERE order_id = ?",
        )
        .bind(status)
        .bind(driver)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(())
    }

    async fn update_order_fields(&self, order_id: &str, patch: &OrderPatch) -> StoreResult<()> {
        let rows = sqlx::query(
            "UPDATE orders SET \
                 status = COALESCE(?, status), \
                 driver_id = COALESCE(?, driver_id), \
                 zone = COALESCE(?, zone), \
                 proof_photo = COALESCE(?, proof_photo), \
                 proof_signature = COALESCE(?, proof_signature), \
                 delivery_notes = COALESCE(?, delivery_notes), \
                 delivered_at = COALESCE(?, delivered_at), \
                 updated_at = ? \
             WHERE order_id = ?",
        )
        .bind(&patch.status)
        .bind(&patch.driver_id)
        .bind(&patch.zone)
        .bind(&patch.proof_photo)
        .bind(&patch.proof_signature)
        .bind(&patch.delivery_notes)
        .bind(patch.delivered_at)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(())
    }

    // === Drivers ===

    async fn save_driver(&self, driver: &Driver) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO drivers
               (driver_id, name, vehicle_type, plate, status, current_zone, phone,
                deliveries_today, success_rate, rating, active_orders,
                latitude, longitude, location_updated_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(driver_id) DO UPDATE SET
                   name = excluded.name,
                   vehicle_type = excluded.vehicle_type,
                   plate = excluded.plate,
                   status = excluded.status,
                   current_zone = excluded.current_zone,
                   phone = excluded.phone"#,
        )
        .bind(&driver.driver_id)
        .bind(&driver.name)
        .bind(&driver.vehicle_type)
        .bind(&driver.plate)
        .bind(&driver.status)
        .bind(&driver.current_zone)
        .bind(&driver.phone)
        .bind(driver.deliveries_today)
        .bind(driver.success_rate)
        .bind(driver.rating)
        .bind(driver.active_orders)
        .bind(driver.latitude)
        .bind(driver.longitude)
        .bind(driver.location_updated_at)
        .bind(driver.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_driver(&self, driver_id: &str, data: &DriverCreate) -> StoreResult<()> {
        let rows = sqlx::query(
            "UPDATE drivers SET name = ?, phone = ?, vehicle_type = ?, plate = ?, \
             status = ?, current_zone = ? WHERE driver_id = ?",
        )
        .bind(&data.name)
        .bind(&data.phone)
        .bind(&data.vehicle_type)
        .bind(&data.plate)
        .bind(&data.status)
        .bind(&data.current_zone)
        .bind(driver_id)
        .execute(&self.pool)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Driver {driver_id} not found")));
        }
        Ok(())
    }

    async fn delete_driver(&self, driver_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM drivers WHERE driver_id = ?")
            .bind(driver_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_drivers(&self) -> StoreResult<Vec<Driver>> {
        // One aggregate query for the whole roster; cost stays linear in
        // the orders table instead of one scan per driver.
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let drivers = sqlx::query_as::<_, Driver>(
            r#"SELECT d.driver_id, d.name, d.vehicle_type, d.plate, d.status,
                      d.current_zone, d.phone,
                      COALESCE(s.deliveries_today, 0) AS deliveries_today,
                      CASE WHEN COALESCE(s.total_completed, 0) > 0
                           THEN CAST(s.total_delivered AS REAL) / s.total_completed
                           ELSE d.success_rate END AS success_rate,
                      d.rating,
                      COALESCE(s.active_orders, 0) AS active_orders,
                      d.latitude, d.longitude, d.location_updated_at, d.created_at
               FROM drivers d
               LEFT JOIN (
                   SELECT driver_id,
                          SUM(CASE WHEN status IN ('allocated', 'in_transit') THEN 1 ELSE 0 END) AS active_orders,
                          SUM(CASE WHEN status = 'delivered' AND order_date = ? THEN 1 ELSE 0 END) AS deliveries_today,
                          SUM(CASE WHEN status IN ('delivered', 'failed') THEN 1 ELSE 0 END) AS total_completed,
                          SUM(CASE WHEN status = 'delivered' THEN 1 ELSE 0 END) AS total_delivered
                   FROM orders
                   WHERE driver_id IS NOT NULL
                   GROUP BY driver_id
               ) s ON s.driver_id = d.driver_id
               ORDER BY d.name"#,
        )
        .bind(&today)
        .fetch_all(&self.pool)
        .await?;
        Ok(drivers)
    }

    async fn get_driver(&self, driver_id: &str) -> StoreResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE driver_id = ?")
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn find_driver_by_phone(&self, phone: &str) -> StoreResult<Option<Driver>> {
        let driver =
            sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE phone = ? LIMIT 1")
                .bind(phone)
                .fetch_optional(&self.pool)
                .await?;
        Ok(driver)
    }

    async fn update_driver_location(
        &self,
        driver_id: &str,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let rows = sqlx::query(
            "UPDATE drivers SET latitude = ?, longitude = ?, location_updated_at = ? \
             WHERE driver_id = ?",
        )
        .bind(latitude)
        .bind(longitude)
        .bind(at)
        .bind(driver_id)
        .execute(&self.pool)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Driver {driver_id} not found")));
        }
        Ok(())
    }

    // === Runs ===

    async fn create_run_with_orders(&self, run: &Run, order_ids: &[String]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO runs (run_id, zone, driver_id, driver_name, status, total_stops, \
             completed, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.run_id)
        .bind(&run.zone)
        .bind(&run.driver_id)
        .bind(&run.driver_name)
        .bind(&run.status)
        .bind(run.total_stops)
        .bind(run.completed)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&mut *tx)
        .await?;

        for (seq, order_id) in order_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO run_orders (run_id, order_id, stop_sequence) VALUES (?, ?, ?)",
            )
            .bind(&run.run_id)
            .bind(order_id)
            .bind((seq + 1) as i64)
            .execute(&mut *tx)
            .await?;

            // allocation cascade: the driver reference written here is the
            // display name, matching what the admin UI has always produced
            let rows = sqlx::query(
                "UPDATE orders SET status = 'allocated', driver_id = ?, updated_at = ? \
                 WHERE order_id = ?",
            )
            .bind(&run.driver_name)
            .bind(Utc::now())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
            if rows.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("Order {order_id} not found")));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_runs(&self) -> StoreResult<Vec<Run>> {
        let runs = sqlx::query_as::<_, Run>("SELECT * FROM runs ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(runs)
    }

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<Run>> {
        let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE run_id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(run)
    }

    async fn update_run_status(&self, run_id: &str, status: &str) -> StoreResult<()> {
        let rows = sqlx::query("UPDATE runs SET status = ?, updated_at = ? WHERE run_id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Run {run_id} not found")));
        }
        Ok(())
    }

    async fn update_run_progress(&self, run_id: &str, completed: i64) -> StoreResult<()> {
        // clamp: 0 <= completed <= total_stops always holds in the store
        let rows = sqlx::query(
            "UPDATE runs SET completed = MIN(MAX(?, 0), total_stops), updated_at = ? \
             WHERE run_id = ?",
        )
        .bind(completed)
        .bind(Utc::now())
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Run {run_id} not found")));
        }
        Ok(())
    }

    async fn count_runs_today(&self, today: &str) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM runs WHERE substr(created_at, 1, 10) = ?")
                .bind(today)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn get_run_orders(&self, run_id: &str) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT o.* FROM orders o \
             JOIN run_orders ro ON o.order_id = ro.order_id \
             WHERE ro.run_id = ? \
             ORDER BY ro.stop_sequence",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    // === Zones ===

    async fn get_zones(&self) -> StoreResult<Vec<Zone>> {
        let zones = sqlx::query_as::<_, Zone>("SELECT * FROM zones ORDER BY zone_name")
            .fetch_all(&self.pool)
            .await?;
        Ok(zones)
    }

    async fn save_zone(&self, zone: &Zone) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO zones (zone_name, suburbs) VALUES (?, ?) \
             ON CONFLICT(zone_name) DO UPDATE SET suburbs = excluded.suburbs",
        )
        .bind(&zone.zone_name)
        .bind(&zone.suburbs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_zone(&self, zone_name: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM zones WHERE zone_name = ?")
            .bind(zone_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn seed_default_zones(&self) -> StoreResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }
        for (zone_name, suburbs) in DEFAULT_ZONES {
            self.save_zone(&Zone {
                zone_name: zone_name.to_string(),
                suburbs: suburbs.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    // === Settings ===

    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_all_settings(&self) -> StoreResult<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    // === Admin users ===

    async fn create_admin_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO admin_users (username, password_hash, salt, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(salt)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let user = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE LOWER(username) = LOWER(?)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn admin_user_count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // === Session tokens ===

    async fn create_session_token(&self, token: &SessionToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO session_tokens (token, username, expires_at, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.username)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session_token(&self, token: &str) -> StoreResult<Option<SessionToken>> {
        let row = sqlx::query_as::<_, SessionToken>(
            "SELECT * FROM session_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_session_token(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM session_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_session_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let rows = sqlx::query("DELETE FROM session_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(rows.rows_affected())
    }

    // === Driver tokens ===

    async fn create_driver_token(&self, token: &DriverToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO driver_tokens (token, driver_id, phone, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.driver_id)
        .bind(&token.phone)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_driver_token(&self, token: &str) -> StoreResult<Option<DriverToken>> {
        let row =
            sqlx::query_as::<_, DriverToken>("SELECT * FROM driver_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn delete_driver_token(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM driver_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_driver_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let rows = sqlx::query("DELETE FROM driver_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(rows.rows_affected())
    }

    // === API log ===

    async fn append_api_log(&self, record: &ApiLogRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO api_log (timestamp, operation, endpoint, request_summary, success, \
             status_code, response_body, error_message) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Utc::now())
        .bind(&record.operation)
        .bind(&record.endpoint)
        .bind(&record.request_summary)
        .bind(record.success)
        .bind(record.status_code)
        .bind(&record.response_body)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_api_log(&self, limit: i64) -> StoreResult<Vec<ApiLogEntry>> {
        let entries = sqlx::query_as::<_, ApiLogEntry>(
            "SELECT * FROM api_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn clear_api_log(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM api_log").execute(&self.pool).await?;
        Ok(())
    }

    // === Receipts ===

    async fn save_receipt(&self, receipt: &Receipt) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO receipts
               (shipment_number, supplier_name, receipt_reference, container_type, due_date,
                status, lines_json, pushed_to_wms, wms_response, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(shipment_number) DO UPDATE SET
                   supplier_name = excluded.supplier_name,
                   receipt_reference = excluded.receipt_reference,
                   container_type = excluded.container_type,
                   due_date = excluded.due_date,
                   status = excluded.status,
                   lines_json = excluded.lines_json,
                   pushed_to_wms = excluded.pushed_to_wms,
                   wms_response = excluded.wms_response"#,
        )
        .bind(&receipt.shipment_number)
        .bind(&receipt.supplier_name)
        .bind(&receipt.receipt_reference)
        .bind(&receipt.container_type)
        .bind(&receipt.due_date)
        .bind(&receipt.status)
        .bind(&receipt.lines_json)
        .bind(receipt.pushed_to_wms)
        .bind(&receipt.wms_response)
        .bind(receipt.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_receipts(&self) -> StoreResult<Vec<Receipt>> {
        let receipts =
            sqlx::query_as::<_, Receipt>("SELECT * FROM receipts ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(receipts)
    }

    // === Items ===

    async fn save_item(&self, item: &Item) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO items
               (item_code, item_name, item_group, barcode, weight, length, width, height,
                unit_of_measure, inner_qty, outer_qty, pallet_qty, pushed_to_wms, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(item_code) DO UPDATE SET
                   item_name = excluded.item_name,
                   item_group = excluded.item_group,
                   barcode = excluded.barcode,
                   weight = excluded.weight,
                   length = excluded.length,
                   width = excluded.width,
                   height = excluded.height,
                   unit_of_measure = excluded.unit_of_measure,
                   inner_qty = excluded.inner_qty,
                   outer_qty = excluded.outer_qty,
                   pallet_qty = excluded.pallet_qty,
                   pushed_to_wms = excluded.pushed_to_wms"#,
        )
        .bind(&item.item_code)
        .bind(&item.item_name)
        .bind(&item.item_group)
        .bind(&item.barcode)
        .bind(item.weight)
        .bind(item.length)
        .bind(item.width)
        .bind(item.height)
        .bind(&item.unit_of_measure)
        .bind(item.inner_qty)
        .bind(item.outer_qty)
        .bind(item.pallet_qty)
        .bind(item.pushed_to_wms)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_item(&self, item_code: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM items WHERE item_code = ?")
            .bind(item_code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_items(&self) -> StoreResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
