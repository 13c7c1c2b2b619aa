//! Managed-Postgres backend
//!
//! Opens a fresh connection per operation instead of holding a pool.
//! Serverless Postgres offerings aggressively close idle connections,
//! turning pooled handles into "connection already closed" errors; a
//! short-lived connection per call sidesteps that entirely.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor};

use async_trait::async_trait;

use super::models::{
    AdminUser, ApiLogEntry, ApiLogRecord, DEFAULT_ZONES, Driver, DriverCreate, DriverToken, Item,
    Order, OrderPatch, Receipt, Run, SessionToken, Zone,
};
use super::{EntityStore, StoreError, StoreResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

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
    parcels BIGINT NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'pending',
    driver_id TEXT,
    special_instructions TEXT,
    pushed_to_wms BOOLEAN NOT NULL DEFAULT FALSE,
    wms_response TEXT,
    order_date TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS drivers (
    driver_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    vehicle_type TEXT NOT NULL DEFAULT 'Van',
    plate TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'available',
    current_zone TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL UNIQUE,
    deliveries_today BIGINT NOT NULL DEFAULT 0,
    success_rate DOUBLE PRECISION NOT NULL DEFAULT 0.95,
    rating DOUBLE PRECISION NOT NULL DEFAULT 4.5,
    active_orders BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    zone TEXT NOT NULL DEFAULT '',
    driver_id TEXT NOT NULL DEFAULT '',
    driver_name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    total_stops BIGINT NOT NULL DEFAULT 0,
    completed BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS run_orders (
    id BIGSERIAL PRIMARY KEY,
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    order_id TEXT NOT NULL REFERENCES orders(order_id),
    stop_sequence BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS zones (
    zone_name TEXT PRIMARY KEY,
    suburbs TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS admin_users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS session_tokens (
    token TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS driver_tokens (
    token TEXT PRIMARY KEY,
    driver_id TEXT NOT NULL,
    phone TEXT NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS api_log (
    id BIGSERIAL PRIMARY KEY,
    timestamp TIMESTAMPTZ NOT NULL,
    operation TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    request_summary TEXT NOT NULL,
    success BOOLEAN NOT NULL,
    status_code BIGINT,
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
    pushed_to_wms BOOLEAN NOT NULL DEFAULT FALSE,
    wms_response TEXT,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    item_code TEXT PRIMARY KEY,
    item_name TEXT NOT NULL DEFAULT '',
    item_group TEXT NOT NULL DEFAULT '',
    barcode TEXT NOT NULL DEFAULT '',
    weight DOUBLE PRECISION,
    length DOUBLE PRECISION,
    width DOUBLE PRECISION,
    height DOUBLE PRECISION,
    unit_of_measure TEXT NOT NULL DEFAULT 'EA',
    inner_qty BIGINT,
    outer_qty BIGINT,
    pallet_qty BIGINT,
    pushed_to_wms BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_driver_id ON orders(driver_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_run_orders_run_id ON run_orders(run_id);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
CREATE INDEX IF NOT EXISTS idx_session_tokens_expires_at ON session_tokens(expires_at);
CREATE INDEX IF NOT EXISTS idx_driver_tokens_expires_at ON driver_tokens(expires_at);
"#;

const ORDER_MIGRATIONS: &[(&str, &str)] = &[
    ("tracking_number", "TEXT"),
    ("zone", "TEXT"),
    ("proof_photo", "TEXT"),
    ("proof_signature", "TEXT"),
    ("delivery_notes", "TEXT"),
    ("delivered_at", "TIMESTAMPTZ"),
];

const DRIVER_MIGRATIONS: &[(&str, &str)] = &[
    ("latitude", "DOUBLE PRECISION"),
    ("longitude", "DOUBLE PRECISION"),
    ("location_updated_at", "TIMESTAMPTZ"),
];

/// Hosted-Postgres store. Holds only the connection URL; every call
/// dials a new connection and drops it when done.
#[derive(Clone)]
pub struct PostgresStore {
    url: String,
}

impl PostgresStore {
    /// Validate the URL by connecting once, then create schema and run
    /// the additive migrations.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let store = Self { url: url.to_string() };
        let mut conn = store.conn().await?;

        conn.execute(sqlx::raw_sql(SCHEMA)).await?;

        for (table, cols) in [("orders", ORDER_MIGRATIONS), ("drivers", DRIVER_MIGRATIONS)] {
            for (col, col_type) in cols {
                let sql = format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {col} {col_type}");
                if let Err(e) = sqlx::query(&sql).execute(&mut conn).await {
                    tracing::debug!(table, col, "Migration skipped: {e}");
                }
            }
        }

        if let Err(e) = sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tracking_number ON orders(tracking_number)",
        )
        .execute(&mut conn)
        .await
        {
            tracing::warn!("Failed to create tracking_number index: {e}");
        }

        tracing::info!("Postgres store ready");
        Ok(store)
    }

    async fn conn(&self) -> StoreResult<PgConnection> {
        // a black-holed network must fail the request, not hang it
        match tokio::time::timeout(CONNECT_TIMEOUT, PgConnection::connect(&self.url)).await {
            Ok(result) => {
                result.map_err(|e| StoreError::Database(format!("Postgres connection failed: {e}")))
            }
            Err(_) => Err(StoreError::Database(format!(
                "Postgres connection timed out after {}s",
                CONNECT_TIMEOUT.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    // === Orders ===

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            r#"INSERT INTO orders
               (order_id, tracking_number, customer, email, phone, address, suburb, state,
                postcode, zone, service_level, parcels, status, driver_id, special_instructions,
                proof_photo, proof_signature, delivery_notes, delivered_at,
                pushed_to_wms, wms_response, order_date, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18, $19, $20, $21, $22, $23, $24)
               ON CONFLICT (order_id) DO UPDATE SET
                   customer = EXCLUDED.customer,
                   email = EXCLUDED.email,
                   phone = EXCLUDED.phone,
                   address = EXCLUDED.address,
                   suburb = EXCLUDED.suburb,
                   state = EXCLUDED.state,
                   postcode = EXCLUDED.postcode,
                   zone = EXCLUDED.zone,
                   service_level = EXCLUDED.service_level,
                   parcels = EXCLUDED.parcels,
                   status = EXCLUDED.status,
                   driver_id = EXCLUDED.driver_id,
                   special_instructions = EXCLUDED.special_instructions,
                   pushed_to_wms = EXCLUDED.pushed_to_wms,
                   wms_response = EXCLUDED.wms_response,
                   updated_at = EXCLUDED.updated_at"#,
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
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_orders(&self) -> StoreResult<Vec<Order>> {
        let mut conn = self.conn().await?;
        let orders =
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&mut conn)
                .await?;
        Ok(orders)
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let mut conn = self.conn().await?;
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&mut conn)
            .await?;
        Ok(order)
    }

    async fn get_order_by_tracking(&self, tracking: &str) -> StoreResult<Option<Order>> {
        let mut conn = self.conn().await?;
        let order =
            sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE tracking_number = $1")
                .bind(tracking)
                .fetch_optional(&mut conn)
                .await?;
        Ok(order)
    }

    async fn tracking_number_exists(&self, tracking: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE tracking_number = $1")
                .bind(tracking)
                .fetch_one(&mut conn)
                .await?;
        Ok(count > 0)
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        driver: Option<&str>,
    ) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query(
            "UPDATE orders SET status = $1, driver_id = COALESCE($2, driver_id), \
             updated_at = $3 WHERE order_id = $4",
        )
        .bind(status)
        .bind(driver)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&mut conn)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(())
    }

    async fn update_order_fields(&self, order_id: &str, patch: &OrderPatch) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query(
            "UPDATE orders SET \
                 status = COALESCE($1, status), \
                 driver_id = COALESCE($2, driver_id), \
                 zone = COALESCE($3, zone), \
                 proof_photo = COALESCE($4, proof_photo), \
                 proof_signature = COALESCE($5, proof_signature), \
                 delivery_notes = COALESCE($6, delivery_notes), \
                 delivered_at = COALESCE($7, delivered_at), \
                 updated_at = $8 \
             WHERE order_id = $9",
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
        .execute(&mut conn)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(())
    }

    // === Drivers ===

    async fn save_driver(&self, driver: &Driver) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            r#"INSERT INTO drivers
               (driver_id, name, vehicle_type, plate, status, current_zone, phone,
                deliveries_today, success_rate, rating, active_orders,
                latitude, longitude, location_updated_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
               ON CONFLICT (driver_id) DO UPDATE SET
                   name = EXCLUDED.name,
                   vehicle_type = EXCLUDED.vehicle_type,
                   plate = EXCLUDED.plate,
                   status = EXCLUDED.status,
                   current_zone = EXCLUDED.current_zone,
                   phone = EXCLUDED.phone"#,
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
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn update_driver(&self, driver_id: &str, data: &DriverCreate) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query(
            "UPDATE drivers SET name = $1, phone = $2, vehicle_type = $3, plate = $4, \
             status = $5, current_zone = $6 WHERE driver_id = $7",
        )
        .bind(&data.name)
        .bind(&data.phone)
        .bind(&data.vehicle_type)
        .bind(&data.plate)
        .bind(&data.status)
        .bind(&data.current_zone)
        .bind(driver_id)
        .execute(&mut conn)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Driver {driver_id} not found")));
        }
        Ok(())
    }

    async fn delete_driver(&self, driver_id: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM drivers WHERE driver_id = $1")
            .bind(driver_id)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_drivers(&self) -> StoreResult<Vec<Driver>> {
        let mut conn = self.conn().await?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let drivers = sqlx::query_as::<_, Driver>(
            r#"SELECT d.driver_id, d.name, d.vehicle_type, d.plate, d.status,
                      d.current_zone, d.phone,
                      COALESCE(s.deliveries_today, 0) AS deliveries_today,
                      CASE WHEN COALESCE(s.total_completed, 0) > 0
                           THEN s.total_delivered::DOUBLE PRECISION / s.total_completed
                           ELSE d.success_rate END AS success_rate,
                      d.rating,
                      COALESCE(s.active_orders, 0) AS active_orders,
                      d.latitude, d.longitude, d.location_updated_at, d.created_at
               FROM drivers d
               LEFT JOIN (
                   SELECT driver_id,
                          SUM(CASE WHEN status IN ('allocated', 'in_transit') THEN 1 ELSE 0 END) AS active_orders,
                          SUM(CASE WHEN status = 'delivered' AND order_date = $1 THEN 1 ELSE 0 END) AS deliveries_today,
                          SUM(CASE WHEN status IN ('delivered', 'failed') THEN 1 ELSE 0 END) AS total_completed,
                          SUM(CASE WHEN status = 'delivered' THEN 1 ELSE 0 END) AS total_delivered
                   FROM orders
                   WHERE driver_id IS NOT NULL
                   GROUP BY driver_id
               ) s ON s.driver_id = d.driver_id
               ORDER BY d.name"#,
        )
        .bind(&today)
        .fetch_all(&mut conn)
        .await?;
        Ok(drivers)
    }

    async fn get_driver(&self, driver_id: &str) -> StoreResult<Option<Driver>> {
        let mut conn = self.conn().await?;
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE driver_id = $1")
            .bind(driver_id)
            .fetch_optional(&mut conn)
            .await?;
        Ok(driver)
    }

    async fn find_driver_by_phone(&self, phone: &str) -> StoreResult<Option<Driver>> {
        let mut conn = self.conn().await?;
        let driver =
            sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE phone = $1 LIMIT 1")
                .bind(phone)
                .fetch_optional(&mut conn)
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
        let mut conn = self.conn().await?;
        let rows = sqlx::query(
            "UPDATE drivers SET latitude = $1, longitude = $2, location_updated_at = $3 \
             WHERE driver_id = $4",
        )
        .bind(latitude)
        .bind(longitude)
        .bind(at)
        .bind(driver_id)
        .execute(&mut conn)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Driver {driver_id} not found")));
        }
        Ok(())
    }

    // === Runs ===

    async fn create_run_with_orders(&self, run: &Run, order_ids: &[String]) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(
            "INSERT INTO runs (run_id, zone, driver_id, driver_name, status, total_stops, \
             completed, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
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
                "INSERT INTO run_orders (run_id, order_id, stop_sequence) VALUES ($1, $2, $3)",
            )
            .bind(&run.run_id)
            .bind(order_id)
            .bind((seq + 1) as i64)
            .execute(&mut *tx)
            .await?;

            let rows = sqlx::query(
                "UPDATE orders SET status = 'allocated', driver_id = $1, updated_at = $2 \
                 WHERE order_id = $3",
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
        let mut conn = self.conn().await?;
        let runs = sqlx::query_as::<_, Run>("SELECT * FROM runs ORDER BY created_at DESC")
            .fetch_all(&mut conn)
            .await?;
        Ok(runs)
    }

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<Run>> {
        let mut conn = self.conn().await?;
        let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE run_id = $1")
            .bind(run_id)
            .fetch_optional(&mut conn)
            .await?;
        Ok(run)
    }

    async fn update_run_status(&self, run_id: &str, status: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query("UPDATE runs SET status = $1, updated_at = $2 WHERE run_id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(run_id)
            .execute(&mut conn)
            .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Run {run_id} not found")));
        }
        Ok(())
    }

    async fn update_run_progress(&self, run_id: &str, completed: i64) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query(
            "UPDATE runs SET completed = LEAST(GREATEST($1, 0), total_stops), updated_at = $2 \
             WHERE run_id = $3",
        )
        .bind(completed)
        .bind(Utc::now())
        .bind(run_id)
        .execute(&mut conn)
        .await?;
        if rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Run {run_id} not found")));
        }
        Ok(())
    }

    async fn count_runs_today(&self, today: &str) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM runs WHERE to_char(created_at, 'YYYY-MM-DD') = $1",
        )
        .bind(today)
        .fetch_one(&mut conn)
        .await?;
        Ok(count)
    }

    async fn get_run_orders(&self, run_id: &str) -> StoreResult<Vec<Order>> {
        let mut conn = self.conn().await?;
        let orders = sqlx::query_as::<_, Order>(
            "SELECT o.* FROM orders o \
             JOIN run_orders ro ON o.order_id = ro.order_id \
             WHERE ro.run_id = $1 \
             ORDER BY ro.stop_sequence",
        )
        .bind(run_id)
        .fetch_all(&mut conn)
        .await?;
        Ok(orders)
    }

    // === Zones ===

    async fn get_zones(&self) -> StoreResult<Vec<Zone>> {
        let mut conn = self.conn().await?;
        let zones = sqlx::query_as::<_, Zone>("SELECT * FROM zones ORDER BY zone_name")
            .fetch_all(&mut conn)
            .await?;
        Ok(zones)
    }

    async fn save_zone(&self, zone: &Zone) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO zones (zone_name, suburbs) VALUES ($1, $2) \
             ON CONFLICT (zone_name) DO UPDATE SET suburbs = EXCLUDED.suburbs",
        )
        .bind(&zone.zone_name)
        .bind(&zone.suburbs)
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn delete_zone(&self, zone_name: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM zones WHERE zone_name = $1")
            .bind(zone_name)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn seed_default_zones(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
            .fetch_one(&mut conn)
            .await?;
        if count > 0 {
            return Ok(());
        }
        for (zone_name, suburbs) in DEFAULT_ZONES {
            sqlx::query(
                "INSERT INTO zones (zone_name, suburbs) VALUES ($1, $2) \
                 ON CONFLICT (zone_name) DO NOTHING",
            )
            .bind(zone_name)
            .bind(suburbs)
            .execute(&mut conn)
            .await?;
        }
        Ok(())
    }

    // === Settings ===

    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&mut conn)
                .await?;
        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_all_settings(&self) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&mut conn)
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
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO admin_users (username, password_hash, salt, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(salt)
        .bind(Utc::now())
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let mut conn = self.conn().await?;
        let user = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&mut conn)
        .await?;
        Ok(user)
    }

    async fn admin_user_count(&self) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&mut conn)
            .await?;
        Ok(count)
    }

    // === Session tokens ===

    async fn create_session_token(&self, token: &SessionToken) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO session_tokens (token, username, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&token.token)
        .bind(&token.username)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_session_token(&self, token: &str) -> StoreResult<Option<SessionToken>> {
        let mut conn = self.conn().await?;
        let row = sqlx::query_as::<_, SessionToken>(
            "SELECT * FROM session_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&mut conn)
        .await?;
        Ok(row)
    }

    async fn delete_session_token(&self, token: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM session_tokens WHERE token = $1")
            .bind(token)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn purge_expired_session_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query("DELETE FROM session_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut conn)
            .await?;
        Ok(rows.rows_affected())
    }

    // === Driver tokens ===

    async fn create_driver_token(&self, token: &DriverToken) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO driver_tokens (token, driver_id, phone, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token)
        .bind(&token.driver_id)
        .bind(&token.phone)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_driver_token(&self, token: &str) -> StoreResult<Option<DriverToken>> {
        let mut conn = self.conn().await?;
        let row =
            sqlx::query_as::<_, DriverToken>("SELECT * FROM driver_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&mut conn)
                .await?;
        Ok(row)
    }

    async fn delete_driver_token(&self, token: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM driver_tokens WHERE token = $1")
            .bind(token)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn purge_expired_driver_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query("DELETE FROM driver_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut conn)
            .await?;
        Ok(rows.rows_affected())
    }

    // === API log ===

    async fn append_api_log(&self, record: &ApiLogRecord) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO api_log (timestamp, operation, endpoint, request_summary, success, \
             status_code, response_body, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Utc::now())
        .bind(&record.operation)
        .bind(&record.endpoint)
        .bind(&record.request_summary)
        .bind(record.success)
        .bind(record.status_code)
        .bind(&record.response_body)
        .bind(&record.error_message)
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn recent_api_log(&self, limit: i64) -> StoreResult<Vec<ApiLogEntry>> {
        let mut conn = self.conn().await?;
        let entries = sqlx::query_as::<_, ApiLogEntry>(
            "SELECT * FROM api_log ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&mut conn)
        .await?;
        Ok(entries)
    }

    async fn clear_api_log(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM api_log").execute(&mut conn).await?;
        Ok(())
    }

    // === Receipts ===

    async fn save_receipt(&self, receipt: &Receipt) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            r#"INSERT INTO receipts
               (shipment_number, supplier_name, receipt_reference, container_type, due_date,
                status, lines_json, pushed_to_wms, wms_response, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (shipment_number) DO UPDATE SET
                   supplier_name = EXCLUDED.supplier_name,
                   receipt_reference = EXCLUDED.receipt_reference,
                   container_type = EXCLUDED.container_type,
                   due_date = EXCLUDED.due_date,
                   status = EXCLUDED.status,
                   lines_json = EXCLUDED.lines_json,
                   pushed_to_wms = EXCLUDED.pushed_to_wms,
                   wms_response = EXCLUDED.wms_response"#,
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
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn get_receipts(&self) -> StoreResult<Vec<Receipt>> {
        let mut conn = self.conn().await?;
        let receipts =
            sqlx::query_as::<_, Receipt>("SELECT * FROM receipts ORDER BY created_at DESC")
                .fetch_all(&mut conn)
                .await?;
        Ok(receipts)
    }

    // === Items ===

    async fn save_item(&self, item: &Item) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            r#"INSERT INTO items
               (item_code, item_name, item_group, barcode, weight, length, width, height,
                unit_of_measure, inner_qty, outer_qty, pallet_qty, pushed_to_wms, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               ON CONFLICT (item_code) DO UPDATE SET
                   item_name = EXCLUDED.item_name,
                   item_group = EXCLUDED.item_group,
                   barcode = EXCLUDED.barcode,
                   weight = EXCLUDED.weight,
                   length = EXCLUDED.length,
                   width = EXCLUDED.width,
                   height = EXCLUDED.height,
                   unit_of_measure = EXCLUDED.unit_of_measure,
                   inner_qty = EXCLUDED.inner_qty,
                   outer_qty = EXCLUDED.outer_qty,
                   pallet_qty = EXCLUDED.pallet_qty,
                   pushed_to_wms = EXCLUDED.pushed_to_wms"#,
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
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn delete_item(&self, item_code: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM items WHERE item_code = $1")
            .bind(item_code)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_items(&self) -> StoreResult<Vec<Item>> {
        let mut conn = self.conn().await?;
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY created_at DESC")
            .fetch_all(&mut conn)
            .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_fails_bounded() {
        // non-routable address: either refused immediately or cut off by
        // the connect timeout, never an indefinite hang
        let started = std::time::Instant::now();
        let result = PostgresStore::connect("postgres://user:pw@10.255.255.1:5432/db").await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(started.elapsed() < CONNECT_TIMEOUT + Duration::from_secs(5));
    }
}
