//! Row types and write DTOs for the entity store
//!
//! The same structs are produced by both backends; the persisted column
//! sets are part of the durable contract and must stay identical whichever
//! backend is selected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default zone seed: zone name → comma-separated suburb list.
///
/// Applied once, only when the zones table is empty.
pub const DEFAULT_ZONES: &[(&str, &str)] = &[
    ("Inner West", "Newtown,Marrickville,Leichhardt,Annandale,Glebe"),
    ("Eastern Suburbs", "Bondi,Randwick,Coogee,Maroubra,Paddington"),
    ("CBD", "Surry Hills,Darlinghurst,Potts Point,Pyrmont"),
    ("South Sydney", "Alexandria,Waterloo,Redfern,Mascot"),
    ("Inner City", "Rozelle,Balmain"),
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: String,
    pub tracking_number: Option<String>,
    pub customer: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub suburb: String,
    pub state: String,
    pub postcode: String,
    pub zone: Option<String>,
    pub service_level: String,
    pub parcels: i64,
    pub status: String,
    /// Driver reference. Historically holds either a driver id or a
    /// display name depending on the producer; see DESIGN.md.
    pub driver_id: Option<String>,
    pub special_instructions: Option<String>,
    pub proof_photo: Option<String>,
    pub proof_signature: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub pushed_to_wms: bool,
    pub wms_response: Option<String>,
    /// Calendar date (YYYY-MM-DD) the order was taken; used for the
    /// deliveries-today roster statistic
    pub order_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating an order. Identifier,
/// tracking number, status, and dates are generated by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub customer: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    pub suburb: String,
    #[serde(default = "default_state")]
    pub state: String,
    pub postcode: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default = "default_service_level")]
    pub service_level: String,
    #[serde(default = "default_parcels")]
    pub parcels: i64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

fn default_state() -> String {
    "NSW".into()
}

fn default_service_level() -> String {
    "standard".into()
}

fn default_parcels() -> i64 {
    1
}

/// Partial update applied to an order; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<String>,
    pub driver_id: Option<String>,
    pub zone: Option<String>,
    pub proof_photo: Option<String>,
    pub proof_signature: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.driver_id.is_none()
            && self.zone.is_none()
            && self.proof_photo.is_none()
            && self.proof_signature.is_none()
            && self.delivery_notes.is_none()
            && self.delivered_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub driver_id: String,
    pub name: String,
    pub vehicle_type: String,
    pub plate: String,
    pub status: String,
    pub current_zone: String,
    pub phone: String,
    /// Recomputed by the roster read; stored value is only a fallback
    pub deliveries_today: i64,
    pub success_rate: f64,
    pub rating: f64,
    pub active_orders: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverCreate {
    pub name: String,
    pub phone: String,
    #[serde(default = "default_vehicle_type")]
    pub vehicle_type: String,
    #[serde(default)]
    pub plate: String,
    #[serde(default = "default_driver_status")]
    pub status: String,
    #[serde(default)]
    pub current_zone: String,
}

fn default_vehicle_type() -> String {
    "Van".into()
}

fn default_driver_status() -> String {
    "available".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Run {
    pub run_id: String,
    pub zone: String,
    pub driver_id: String,
    pub driver_name: String,
    pub status: String,
    pub total_stops: i64,
    pub completed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Zone {
    pub zone_name: String,
    pub suburbs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionToken {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DriverToken {
    pub token: String,
    pub driver_id: String,
    pub phone: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub endpoint: String,
    pub request_summary: String,
    pub success: bool,
    pub status_code: Option<i64>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
}

/// Write side of the audit log; the id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct ApiLogRecord {
    pub operation: String,
    pub endpoint: String,
    pub request_summary: String,
    pub success: bool,
    pub status_code: Option<i64>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Receipt {
    pub shipment_number: String,
    pub supplier_name: String,
    pub receipt_reference: String,
    pub container_type: String,
    pub due_date: String,
    pub status: String,
    pub lines_json: String,
    pub pushed_to_wms: bool,
    pub wms_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptCreate {
    pub shipment_number: String,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub receipt_reference: String,
    #[serde(default)]
    pub container_type: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default = "default_pending")]
    pub status: String,
    #[serde(default = "default_lines")]
    pub lines: serde_json::Value,
}

fn default_pending() -> String {
    "pending".into()
}

fn default_lines() -> serde_json::Value {
    serde_json::Value::Array(vec![])
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub item_code: String,
    pub item_name: String,
    pub item_group: String,
    pub barcode: String,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub unit_of_measure: String,
    pub inner_qty: Option<i64>,
    pub outer_qty: Option<i64>,
    pub pallet_qty: Option<i64>,
    pub pushed_to_wms: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpsert {
    pub item_code: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_group: String,
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_uom")]
    pub unit_of_measure: String,
    #[serde(default)]
    pub inner_qty: Option<i64>,
    #[serde(default)]
    pub outer_qty: Option<i64>,
    #[serde(default)]
    pub pallet_qty: Option<i64>,
}

fn default_uom() -> String {
    "EA".into()
}
