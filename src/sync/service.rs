use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};

use crate::audit::AuditLog;
use crate::core::error::{AppError, Result};
use crate::lifecycle::{OrderStatus, RunStatus};
use crate::store::EntityStore;
use crate::store::models::{
    Driver, DriverCreate, Item, ItemUpsert, Order, OrderCreate, OrderPatch, Receipt,
    ReceiptCreate, Run, Zone,
};
use crate::wms::{WmsGateway, WmsOutcome};

use super::demo;
use super::{
    CancelResult, CreateDriverResult, CreateOrderResult, CreateRunResult, GatewayResult,
    SyncAck, SyncMode,
};

const TRACKING_ATTEMPTS: usize = 10;

/// Top-level façade for every mutating use case. Mode and collaborators
/// are fixed at construction; nothing here reads ambient state per call.
pub struct SyncService {
    store: Arc<dyn EntityStore>,
    gateway: Option<Arc<dyn WmsGateway>>,
    audit: AuditLog,
    mode: SyncMode,
    wms_base: String,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        gateway: Option<Arc<dyn WmsGateway>>,
        audit: AuditLog,
        mode: SyncMode,
        wms_base: String,
    ) -> Self {
        Self {
            store,
            gateway,
            audit,
            mode,
            wms_base,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    fn is_live(&self) -> bool {
        self.mode == SyncMode::Live && self.gateway.is_some()
    }

    fn is_demo(&self) -> bool {
        self.mode == SyncMode::Demo
    }

    /// One gateway call, one audit record.
    async fn push(&self, operation: &str, summary: String, payload: Value) -> WmsOutcome {
        let outcome = match &self.gateway {
            Some(gateway) => gateway.post(operation, payload).await,
            None => WmsOutcome::failure("WMS not configured"),
        };
        let endpoint = format!("{}/{}/", self.wms_base, operation);
        self.audit.record(operation, &endpoint, &summary, &outcome).await;
        outcome
    }

    // === Orders ===

    pub async fn get_orders(&self) -> Result<Vec<Order>> {
        if self.is_demo() {
            return Ok(demo::orders(50));
        }
        Ok(self.store.get_orders().await?)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.store.get_order(order_id).await?)
    }

    pub async fn get_order_by_tracking(&self, tracking: &str) -> Result<Option<Order>> {
        Ok(self.store.get_order_by_tracking(tracking).await?)
    }

    pub async fn create_order(&self, data: OrderCreate) -> Result<CreateOrderResult> {
        if data.customer.trim().is_empty() {
            return Err(AppError::Validation("Customer name is required".into()));
        }
        if data.address.trim().is_empty() {
            return Err(AppError::Validation("Address is required".into()));
        }
        if data.parcels < 1 {
            return Err(AppError::Validation("Parcel count must be at least 1".into()));
        }

        if self.is_demo() {
            let mut rng = rand::thread_rng();
            return Ok(CreateOrderResult {
                success: true,
                order_id: format!("SMC-{}", rng.gen_range(10000..=99999)),
                tracking_number: format!(
                    "WRX-{}-{:06X}",
                    Utc::now().format("%y%m"),
                    rng.gen_range(0..0x1000000u32)
                ),
                wms_pushed: false,
                mock: true,
            });
        }

        let order_id = format!("SMC-{}", rand::thread_rng().gen_range(10000..=99999));
        let tracking_number = self.generate_tracking_number().await?;
        let now = Utc::now();

        let mut wms_response = None;
        let mut pushed = false;
        if self.is_live() {
            let payload = json!({
                "OrderNumber": order_id,
                "TrackingNumber": tracking_number,
                "Customer": data.customer,
                "Address": data.address,
                "Suburb": data.suburb,
                "State": data.state,
                "Postcode": data.postcode,
                "ServiceLevel": data.service_level,
                "Parcels": data.parcels,
            });
            let summary = format!("Order {order_id} for {}", data.customer);
            let outcome = self.push("UpsertFulfilmentRequest", summary, payload).await;
            pushed = outcome.success;
            wms_response = outcome.response_text();
        }

        // creation is locally authoritative: the order is saved even
        // when the push failed, flagged as not yet pushed
        let order = Order {
            order_id: order_id.clone(),
            tracking_number: Some(tracking_number.clone()),
            customer: data.customer,
            email: data.email,
            phone: data.phone,
            address: data.address,
            suburb: data.suburb,
            state: data.state,
            postcode: data.postcode,
            zone: data.zone,
            service_level: data.service_level,
            parcels: data.parcels,
            status: OrderStatus::Pending.as_str().to_string(),
            driver_id: None,
            special_instructions: data.special_instructions,
            proof_photo: None,
            proof_signature: None,
            delivery_notes: None,
            delivered_at: None,
            pushed_to_wms: pushed,
            wms_response,
            order_date: now.format("%Y-%m-%d").to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.save_order(&order).await?;

        tracing::info!(order_id, tracking_number, pushed, "Created order");
        Ok(CreateOrderResult {
            success: true,
            order_id,
            tracking_number,
            wms_pushed: pushed,
            mock: false,
        })
    }

    /// Retry push for an order that was saved with `pushed_to_wms=false`.
    /// The pushed flag is persisted only when the gateway confirms.
    pub async fn push_order_to_wms(&self, order_id: &str) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::unconfigured());
        }
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

        let payload = json!({
            "OrderNumber": order.order_id,
            "TrackingNumber": order.tracking_number,
            "Customer": order.customer,
            "Address": order.address,
            "Suburb": order.suburb,
            "State": order.state,
            "Postcode": order.postcode,
            "ServiceLevel": order.service_level,
            "Parcels": order.parcels,
        });
        let summary = format!("Push order {order_id}");
        let outcome = self.push("UpsertFulfilmentRequest", summary, payload).await;

        if outcome.success {
            order.pushed_to_wms = true;
            order.wms_response = outcome.response_text();
            order.updated_at = Utc::now();
            self.store.save_order(&order).await?;
        }
        Ok(outcome.into())
    }

    /// Cancellation is externally authoritative: in live mode the remote
    /// push must succeed before the local status changes.
    pub async fn cancel_order(&self, order_id: &str) -> Result<CancelResult> {
        if self.is_demo() {
            return Ok(CancelResult::ok(true));
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
        let status = OrderStatus::parse(&order.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown order status '{}'", order.status)))?;
        if !status.can_cancel() {
            return Err(AppError::Validation(format!(
                "Order {order_id} cannot be cancelled from status '{}'",
                order.status
            )));
        }

        if self.is_live() {
            let payload = json!({ "OrderNumber": order_id });
            let summary = format!("Cancel order {order_id}");
            let outcome = self.push("CancelSalesOrder", summary, payload).await;
            if !outcome.success {
                return Ok(CancelResult::refused(&outcome));
            }
        }

        self.store
            .update_order_status(order_id, OrderStatus::Failed.as_str(), None)
            .await?;
        Ok(CancelResult::ok(false))
    }

    /// Assign an order to a driver. Allocating an already-allocated order
    /// advances it to in_transit.
    pub async fn allocate_order(&self, order_id: &str, driver_name: &str) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
        let current = OrderStatus::parse(&order.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown order status '{}'", order.status)))?;

        let next = if current == OrderStatus::Allocated {
            OrderStatus::InTransit
        } else {
            OrderStatus::Allocated
        };
        if !current.can_transition(next) {
            return Err(AppError::Validation(format!(
                "Order {order_id} cannot move from '{}' to '{}'",
                current, next
            )));
        }
        self.store
            .update_order_status(order_id, next.as_str(), Some(driver_name))
            .await?;
        Ok(())
    }

    pub async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(AppError::Validation("No fields to update".into()));
        }

        if let Some(requested) = &patch.status {
            let order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
            let current = OrderStatus::parse(&order.status).ok_or_else(|| {
                AppError::Internal(format!("Unknown order status '{}'", order.status))
            })?;
            let next = OrderStatus::parse(requested)
                .ok_or_else(|| AppError::Validation(format!("Unknown status '{requested}'")))?;
            if next != current && !current.can_transition(next) {
                return Err(AppError::Validation(format!(
                    "Order {order_id} cannot move from '{current}' to '{next}'"
                )));
            }
        }

        self.store.update_order_fields(order_id, patch).await?;
        Ok(())
    }

    async fn generate_tracking_number(&self) -> Result<String> {
        let prefix = Utc::now().format("%y%m").to_string();
        for _ in 0..TRACKING_ATTEMPTS {
            let hex_part: u32 = rand::thread_rng().gen_range(0..0x1000000);
            let tracking = format!("WRX-{prefix}-{hex_part:06X}");
            if !self.store.tracking_number_exists(&tracking).await? {
                return Ok(tracking);
            }
        }
        Err(AppError::Conflict(
            "Failed to generate a unique tracking number".into(),
        ))
    }

    // === Drivers ===

    pub async fn get_drivers(&self) -> Result<Vec<Driver>> {
        if self.is_demo() {
            return Ok(demo::drivers(10));
        }
        Ok(self.store.get_drivers().await?)
    }

    pub async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>> {
        Ok(self.store.get_driver(driver_id).await?)
    }

    pub async fn add_driver(&self, data: DriverCreate) -> Result<CreateDriverResult> {
        if data.name.trim().is_empty() || data.phone.trim().is_empty() {
            return Err(AppError::Validation("Driver name and phone are required".into()));
        }

        let driver_id = format!("DRV-{}", rand::thread_rng().gen_range(100..=999));
        if self.is_demo() {
            return Ok(CreateDriverResult {
                success: true,
                driver_id,
                mock: true,
            });
        }

        if self.store.find_driver_by_phone(&data.phone).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A driver with phone {} already exists",
                data.phone
            )));
        }

        let driver = Driver {
            driver_id: driver_id.clone(),
            name: data.name,
            vehicle_type: data.vehicle_type,
            plate: data.plate,
            status: data.status,
            current_zone: data.current_zone,
            phone: data.phone,
            deliveries_today: 0,
            success_rate: 0.95,
            rating: 4.5,
            active_orders: 0,
            latitude: None,
            longitude: None,
            location_updated_at: None,
            created_at: Utc::now(),
        };
        self.store.save_driver(&driver).await?;
        tracing::info!(driver_id, "Added driver");
        Ok(CreateDriverResult {
            success: true,
            driver_id,
            mock: false,
        })
    }

    pub async fn update_driver(&self, driver_id: &str, data: &DriverCreate) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        Ok(self.store.update_driver(driver_id, data).await?)
    }

    pub async fn delete_driver(&self, driver_id: &str) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        Ok(self.store.delete_driver(driver_id).await?)
    }

    pub async fn update_driver_location(
        &self,
        driver_id: &str,
        latitude: f64,
        longitude: f64,
        at: Option<chrono::DateTime<Utc>>,
    ) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        Ok(self
            .store
            .update_driver_location(driver_id, latitude, longitude, at.unwrap_or_else(Utc::now))
            .await?)
    }

    // === Runs ===

    pub async fn get_runs(&self) -> Result<Vec<Run>> {
        if self.is_demo() {
            return Ok(demo::runs(15));
        }
        Ok(self.store.get_runs().await?)
    }

    pub async fn get_run_orders(&self, run_id: &str) -> Result<Vec<Order>> {
        Ok(self.store.get_run_orders(run_id).await?)
    }

    pub async fn create_run(
        &self,
        zone: &str,
        driver_id: &str,
        driver_name: &str,
        order_ids: &[String],
    ) -> Result<CreateRunResult> {
        if order_ids.is_empty() {
            return Err(AppError::Validation("A run needs at least one order".into()));
        }

        let today = Utc::now().format("%y%m%d").to_string();
        if self.is_demo() {
            return Ok(CreateRunResult {
                success: true,
                run_id: format!("RUN-{today}-001"),
                mock: true,
            });
        }

        // every member must still be pending; a terminal order must never
        // be resurrected by the allocation cascade
        for order_id in order_ids {
            let order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
            let status = OrderStatus::parse(&order.status).ok_or_else(|| {
                AppError::Internal(format!("Unknown order status '{}'", order.status))
            })?;
            if status != OrderStatus::Pending {
                return Err(AppError::Validation(format!(
                    "Order {order_id} cannot join a run from status '{status}'"
                )));
            }
        }

        let count = self
            .store
            .count_runs_today(&Utc::now().format("%Y-%m-%d").to_string())
            .await?;
        let run_id = format!("RUN-{today}-{:03}", count + 1);

        let now = Utc::now();
        let run = Run {
            run_id: run_id.clone(),
            zone: zone.to_string(),
            driver_id: driver_id.to_string(),
            driver_name: driver_name.to_string(),
            status: RunStatus::Active.as_str().to_string(),
            total_stops: order_ids.len() as i64,
            completed: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.create_run_with_orders(&run, order_ids).await?;

        tracing::info!(run_id, stops = order_ids.len(), "Created run");
        Ok(CreateRunResult {
            success: true,
            run_id,
            mock: false,
        })
    }

    pub async fn update_run_progress(&self, run_id: &str, completed: i64) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        Ok(self.store.update_run_progress(run_id, completed).await?)
    }

    /// Close out a run: all member orders become delivered and progress
    /// snaps to the stop count.
    pub async fn complete_run(&self, run_id: &str) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        let run = self.require_active_run(run_id).await?;

        self.store
            .update_run_status(run_id, RunStatus::Completed.as_str())
            .await?;
        let members = self.store.get_run_orders(run_id).await?;
        for order in &members {
            self.store
                .update_order_status(&order.order_id, OrderStatus::Delivered.as_str(), None)
                .await?;
        }
        self.store.update_run_progress(run_id, run.total_stops).await?;
        Ok(())
    }

    /// Abandon a run: members fall back to pending, undoing allocation.
    pub async fn cancel_run(&self, run_id: &str) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        self.require_active_run(run_id).await?;

        self.store
            .update_run_status(run_id, RunStatus::Cancelled.as_str())
            .await?;
        let members = self.store.get_run_orders(run_id).await?;
        for order in &members {
            self.store
                .update_order_status(&order.order_id, OrderStatus::Pending.as_str(), None)
                .await?;
        }
        Ok(())
    }

    async fn require_active_run(&self, run_id: &str) -> Result<Run> {
        let run = self
            .store
            .get_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;
        let status = RunStatus::parse(&run.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown run status '{}'", run.status)))?;
        if status.is_terminal() {
            return Err(AppError::Validation(format!(
                "Run {run_id} is already {}",
                run.status
            )));
        }
        Ok(run)
    }

    // === Zones & settings ===

    pub async fn get_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.store.get_zones().await?)
    }

    pub async fn save_zone(&self, zone: &Zone) -> Result<()> {
        Ok(self.store.save_zone(zone).await?)
    }

    pub async fn delete_zone(&self, zone_name: &str) -> Result<()> {
        Ok(self.store.delete_zone(zone_name).await?)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get_setting(key).await?)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.store.set_setting(key, value).await?)
    }

    pub async fn get_all_settings(&self) -> Result<Vec<(String, String)>> {
        Ok(self.store.get_all_settings().await?)
    }

    // === Receipts ===

    pub async fn get_receipts(&self) -> Result<Vec<Receipt>> {
        if self.is_demo() {
            return Ok(Vec::new());
        }
        Ok(self.store.get_receipts().await?)
    }

    pub async fn create_receipt(&self, data: ReceiptCreate) -> Result<SyncAck> {
        if data.shipment_number.trim().is_empty() {
            return Err(AppError::Validation("Shipment number is required".into()));
        }
        if self.is_demo() {
            return Ok(SyncAck {
                success: true,
                wms_pushed: false,
                mock: true,
            });
        }

        let mut wms_response = None;
        let mut pushed = false;
        if self.is_live() {
            let payload = json!({
                "ShipmentNumber": data.shipment_number,
                "SupplierName": data.supplier_name,
                "ReceiptReference": data.receipt_reference,
                "ContainerType": data.container_type,
                "DueDate": data.due_date,
                "Lines": data.lines,
            });
            let summary = format!("Receipt {}", data.shipment_number);
            let outcome = self.push("UpsertASNReceipt", summary, payload).await;
            pushed = outcome.success;
            wms_response = outcome.response_text();
        }

        let receipt = Receipt {
            shipment_number: data.shipment_number,
            supplier_name: data.supplier_name,
            receipt_reference: data.receipt_reference,
            container_type: data.container_type,
            due_date: data.due_date,
            status: data.status,
            lines_json: data.lines.to_string(),
            pushed_to_wms: pushed,
            wms_response,
            created_at: Utc::now(),
        };
        self.store.save_receipt(&receipt).await?;
        Ok(SyncAck {
            success: true,
            wms_pushed: pushed,
            mock: false,
        })
    }

    pub async fn cancel_receipt(&self, shipment_number: &str, reason: &str) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let payload = json!({
            "ShipmentNumber": shipment_number,
            "Reason": reason,
        });
        let summary = format!("Cancel receipt {shipment_number}");
        let outcome = self.push("CancelReceiptJob", summary, payload).await;
        Ok(outcome.into())
    }

    // === Items ===

    pub async fn get_items(&self) -> Result<Vec<Item>> {
        if self.is_demo() {
            return Ok(Vec::new());
        }
        Ok(self.store.get_items().await?)
    }

    pub async fn upsert_item(&self, data: ItemUpsert) -> Result<SyncAck> {
        if data.item_code.trim().is_empty() {
            return Err(AppError::Validation("Item code is required".into()));
        }
        if self.is_demo() {
            return Ok(SyncAck {
                success: true,
                wms_pushed: false,
                mock: true,
            });
        }

        let mut pushed = false;
        if self.is_live() {
            let payload = json!({
                "ItemCode": data.item_code,
                "ItemName": data.item_name,
                "ItemGroup": data.item_group,
                "Barcode": data.barcode,
                "UnitOfMeasure": data.unit_of_measure,
            });
            let summary = format!("Item {}", data.item_code);
            let outcome = self.push("UpsertItemMasterData", summary, payload).await;
            pushed = outcome.success;
        }

        let item = Item {
            item_code: data.item_code,
            item_name: data.item_name,
            item_group: data.item_group,
            barcode: data.barcode,
            weight: data.weight,
            length: data.length,
            width: data.width,
            height: data.height,
            unit_of_measure: data.unit_of_measure,
            inner_qty: data.inner_qty,
            outer_qty: data.outer_qty,
            pallet_qty: data.pallet_qty,
            pushed_to_wms: pushed,
            created_at: Utc::now(),
        };
        self.store.save_item(&item).await?;
        Ok(SyncAck {
            success: true,
            wms_pushed: pushed,
            mock: false,
        })
    }

    /// Cancel-style: in live mode the remote delete must succeed before
    /// the local row goes away.
    pub async fn delete_item(&self, item_code: &str) -> Result<GatewayResult> {
        if self.is_demo() {
            return Ok(GatewayResult::mock());
        }
        if self.is_live() {
            let payload = json!({ "ItemCode": item_code });
            let summary = format!("Delete item {item_code}");
            let outcome = self.push("DeleteItemMasterData", summary, payload).await;
            if !outcome.success {
                return Ok(outcome.into());
            }
            self.store.delete_item(item_code).await?;
            return Ok(outcome.into());
        }
        self.store.delete_item(item_code).await?;
        Ok(GatewayResult {
            success: true,
            mock: false,
            status_code: None,
            response: None,
            error: None,
        })
    }

    // === Stock / ULD / kitting passthroughs ===

    pub async fn adjust_stock(&self, adjustment: Value) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let summary = format!(
            "Adjust {} on {}",
            json_str(&adjustment, "item_code"),
            json_str(&adjustment, "uld_barcode"),
        );
        let outcome = self.push("AdjustULDStock", summary, adjustment).await;
        Ok(outcome.into())
    }

    pub async fn create_uld(&self, uld: Value) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let summary = format!("Create ULD {}", json_str(&uld, "barcode"));
        let outcome = self.push("CreateULD", summary, uld).await;
        Ok(outcome.into())
    }

    pub async fn destroy_uld(&self, uld_barcode: &str) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let payload = json!({ "Barcode": uld_barcode });
        let summary = format!("Destroy ULD {uld_barcode}");
        let outcome = self.push("DestroyULD", summary, payload).await;
        Ok(outcome.into())
    }

    pub async fn move_uld(&self, uld_barcode: &str, new_location: &str) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let payload = json!({
            "Barcode": uld_barcode,
            "NewLocation": new_location,
        });
        let summary = format!("Move ULD {uld_barcode} to {new_location}");
        let outcome = self.push("MoveULD", summary, payload).await;
        Ok(outcome.into())
    }

    pub async fn create_kitting_job(&self, job: Value) -> Result<GatewayResult> {
        if !self.is_live() {
            return Ok(GatewayResult::mock());
        }
        let summary = format!("Kitting job {}", json_str(&job, "pack_slip_number"));
        let outcome = self.push("UploadKitJob", summary, job).await;
        Ok(outcome.into())
    }

    // === Connection ===

    pub async fn test_wms_connection(&self) -> Result<GatewayResult> {
        let gateway = match (&self.gateway, self.is_live()) {
            (Some(g), true) => g,
            _ => return Ok(GatewayResult::unconfigured()),
        };
        let outcome = gateway.test_connection().await;
        self.audit
            .record("TestConnection", &self.wms_base, "Connection test", &outcome)
            .await;
        Ok(outcome.into())
    }
}

fn json_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("unknown")
}
