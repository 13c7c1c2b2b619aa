use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{CurrentDriver, bearer_token};
use crate::core::{AppError, Result, ServerState};
use crate::lifecycle::OrderStatus;
use crate::store::models::{Order, OrderPatch};

// === Login ===

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    id: String,
    name: String,
    phone: String,
    vehicle_type: String,
    plate_number: String,
    rating: f64,
    total_deliveries: i64,
    success_rate: f64,
    status: String,
    current_zone: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    token: String,
    driver: DriverSummary,
    expires_at: DateTime<Utc>,
}

/// Authenticate by phone number and issue a 30-day bearer token.
pub async fn login(
    State(state): State<ServerState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let phone = body.phone.as_deref().unwrap_or("").trim().to_string();
    if phone.is_empty() {
        return Err(AppError::Validation("Phone number is required".into()));
    }

    // each login sweeps expired tokens of both families
    state.tokens.purge_expired().await?;

    let driver = state
        .sync
        .get_drivers()
        .await?
        .into_iter()
        .find(|d| d.phone == phone)
        .ok_or_else(|| AppError::NotFound("No driver with this phone number".into()))?;

    let token = state
        .tokens
        .issue_driver_token(&driver.driver_id, &driver.phone)
        .await?;

    tracing::info!(driver_id = driver.driver_id, "Driver logged in");

    Ok(Json(LoginResponse {
        success: true,
        token: token.token,
        driver: DriverSummary {
            id: driver.driver_id,
            name: driver.name,
            phone: driver.phone,
            vehicle_type: driver.vehicle_type,
            plate_number: driver.plate,
            rating: driver.rating,
            total_deliveries: driver.deliveries_today,
            success_rate: driver.success_rate,
            status: driver.status,
            current_zone: driver.current_zone,
        },
        expires_at: token.expires_at,
    }))
}

// === Runs ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    id: String,
    run_number: String,
    zone: String,
    date: DateTime<Utc>,
    status: &'static str,
    total_stops: usize,
    completed_stops: usize,
    /// Seconds, at 10 minutes per stop.
    estimated_duration: usize,
    /// Kilometres, at 2.5 km per stop.
    total_distance: f64,
}

#[derive(Serialize)]
pub struct RunsResponse {
    runs: Vec<RunView>,
    total: usize,
}

/// A driver's "run" is a synthesized view over all orders assigned to
/// them, not a stored Run row.
pub async fn runs(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentDriver>,
) -> Result<Json<RunsResponse>> {
    let orders = orders_for_driver(&state, &current).await?;
    if orders.is_empty() {
        return Ok(Json(RunsResponse { runs: vec![], total: 0 }));
    }

    let total_stops = orders.len();
    let completed = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Delivered.as_str())
        .count();
    let status = if completed == 0 {
        "Pending"
    } else if completed < total_stops {
        "Active"
    } else {
        "Completed"
    };

    let today = Utc::now().format("%Y%m%d");
    let run = RunView {
        id: format!("RUN-{}-{today}", current.driver_id),
        run_number: format!("RUN-{today}"),
        zone: "Today's Deliveries".to_string(),
        date: Utc::now(),
        status,
        total_stops,
        completed_stops: completed,
        estimated_duration: total_stops * 600,
        total_distance: total_stops as f64 * 2.5,
    };

    Ok(Json(RunsResponse { runs: vec![run], total: 1 }))
}

// === Stops ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    id: String,
    name: String,
    phone: String,
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    street: String,
    suburb: String,
    postcode: String,
    state: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    id: String,
    order_number: String,
    customer: CustomerView,
    address: AddressView,
    parcels: i64,
    service_level: String,
    special_instructions: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopView {
    id: String,
    sequence_number: usize,
    status: &'static str,
    order: OrderView,
}

#[derive(Serialize)]
pub struct StopsResponse {
    stops: Vec<StopView>,
    total: usize,
}

/// Stops for the authenticated driver. The run id in the path is
/// accepted but not consulted; the stop list is always derived from the
/// driver's current orders.
pub async fn run_stops(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentDriver>,
    Path(_run_id): Path<String>,
) -> Result<Json<StopsResponse>> {
    let orders = orders_for_driver(&state, &current).await?;

    let stops: Vec<StopView> = orders
        .into_iter()
        .enumerate()
        .map(|(idx, order)| stop_view(idx + 1, order))
        .collect();
    let total = stops.len();

    Ok(Json(StopsResponse { stops, total }))
}

fn stop_view(sequence: usize, order: Order) -> StopView {
    let status = OrderStatus::parse(&order.status)
        .map(|s| s.as_mobile())
        .unwrap_or("pending");

    StopView {
        id: order.order_id.clone(),
        sequence_number: sequence,
        status,
        order: OrderView {
            id: order.order_id.clone(),
            order_number: order.order_id,
            customer: CustomerView {
                id: format!("C-{sequence}"),
                name: order.customer,
                phone: order.phone.unwrap_or_default(),
                email: order.email.filter(|e| !e.is_empty()),
            },
            address: AddressView {
                street: order.address,
                suburb: order.suburb,
                postcode: order.postcode,
                state: order.state,
                // fixed city-centre coordinates; geocoding lives upstream
                latitude: -33.8688,
                longitude: 151.2093,
            },
            parcels: order.parcels,
            service_level: order.service_level,
            special_instructions: order.special_instructions.filter(|s| !s.is_empty()),
            created_at: order.created_at,
        },
    }
}

// === Stop update ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopUpdateRequest {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    signature: Option<String>,
}

#[derive(Serialize)]
pub struct StopUpdateResponse {
    success: bool,
    message: String,
}

/// Update a stop's status and/or proof of delivery. At least one field
/// must be present; delivered/failed transitions stamp `delivered_at`.
pub async fn update_stop(
    State(state): State<ServerState>,
    Extension(_current): Extension<CurrentDriver>,
    Path(stop_id): Path<String>,
    Json(body): Json<StopUpdateRequest>,
) -> Result<Json<StopUpdateResponse>> {
    if body.status.is_none()
        && body.notes.is_none()
        && body.photo.is_none()
        && body.signature.is_none()
    {
        return Err(AppError::Validation(
            "At least one of status, notes, photo, or signature is required".into(),
        ));
    }

    let mut patch = OrderPatch::default();

    if let Some(mobile_status) = &body.status {
        let status = OrderStatus::from_mobile(mobile_status)
            .ok_or_else(|| AppError::Validation(format!("Unknown status '{mobile_status}'")))?;
        if matches!(status, OrderStatus::Delivered | OrderStatus::Failed) {
            patch.delivered_at = Some(Utc::now());
        }
        patch.status = Some(status.as_str().to_string());
    }

    patch.delivery_notes = body.notes;
    // stored as data URLs so the dashboard can render them directly
    patch.proof_photo = body.photo.map(|p| format!("data:image/jpeg;base64,{p}"));
    patch.proof_signature = body.signature.map(|s| format!("data:image/png;base64,{s}"));

    state.sync.update_order(&stop_id, &patch).await?;

    Ok(Json(StopUpdateResponse {
        success: true,
        message: format!("Stop {stop_id} updated"),
    }))
}

// === Profile ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    deliveries_today: usize,
    total_deliveries: usize,
    success_rate: f64,
    active_orders: i64,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    driver: DriverSummary,
    stats: ProfileStats,
}

pub async fn profile(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentDriver>,
) -> Result<Json<ProfileResponse>> {
    let driver = state
        .sync
        .get_driver(&current.driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".into()))?;

    // stats here match strictly on driver id, unlike the stop list
    let orders = state.sync.get_orders().await?;
    let mine: Vec<&Order> = orders
        .iter()
        .filter(|o| o.driver_id.as_deref() == Some(current.driver_id.as_str()))
        .collect();

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let deliveries_today = mine
        .iter()
        .filter(|o| o.status == OrderStatus::Delivered.as_str() && o.order_date == today)
        .count();
    let total_deliveries = mine
        .iter()
        .filter(|o| o.status == OrderStatus::Delivered.as_str())
        .count();

    Ok(Json(ProfileResponse {
        driver: DriverSummary {
            id: driver.driver_id,
            name: driver.name,
            phone: driver.phone,
            vehicle_type: driver.vehicle_type,
            plate_number: driver.plate,
            rating: driver.rating,
            total_deliveries: driver.deliveries_today,
            success_rate: driver.success_rate,
            status: driver.status,
            current_zone: driver.current_zone,
        },
        stats: ProfileStats {
            deliveries_today,
            total_deliveries,
            success_rate: driver.success_rate,
            active_orders: driver.active_orders,
        },
    }))
}

// === Location ===

#[derive(Deserialize)]
pub struct LocationRequest {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct AckResponse {
    success: bool,
    message: &'static str,
}

pub async fn update_location(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentDriver>,
    Json(body): Json<LocationRequest>,
) -> Result<Json<AckResponse>> {
    let (latitude, longitude) = match (body.latitude, body.longitude) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(AppError::Validation(
                "Latitude and longitude are required".into(),
            ));
        }
    };

    state
        .sync
        .update_driver_location(&current.driver_id, latitude, longitude, body.timestamp)
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: "Location updated",
    }))
}

// === Logout ===

pub async fn logout(
    State(state): State<ServerState>,
    Extension(_current): Extension<CurrentDriver>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>> {
    if let Some(token) = bearer_token(&headers) {
        state.tokens.revoke_driver_token(token).await?;
    }
    Ok(Json(AckResponse {
        success: true,
        message: "Logged out successfully",
    }))
}

/// Orders assigned to this driver. Matches the `driver_id` column
/// against the driver's id or display name, because run allocation
/// writes the display name into that column.
async fn orders_for_driver(state: &ServerState, current: &CurrentDriver) -> Result<Vec<Order>> {
    let name = state
        .sync
        .get_driver(&current.driver_id)
        .await?
        .map(|d| d.name);

    let orders = state.sync.get_orders().await?;
    Ok(orders
        .into_iter()
        .filter(|o| match o.driver_id.as_deref() {
            Some(assigned) => {
                assigned == current.driver_id || name.as_deref() == Some(assigned)
            }
            None => false,
        })
        .collect())
}
