//! Orchestrator behaviour: push/persist/audit sequencing, the
//! creation/cancellation asymmetry, run cascades, and demo isolation.

mod common;

use std::sync::Arc;

use courier_server::AppError;
use courier_server::audit::AuditLog;
use courier_server::store::models::{OrderCreate, OrderPatch};
use courier_server::sync::SyncMode;

use common::{MockGateway, sync_service};

fn order_input(customer: &str) -> OrderCreate {
    serde_json::from_value(serde_json::json!({
        "customer": customer,
        "address": "1 King St",
        "suburb": "Surry Hills",
        "postcode": "2010",
        "parcels": 2,
    }))
    .unwrap()
}

#[tokio::test]
async fn create_order_local_mode_persists_without_push() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;

    let result = sync.create_order(order_input("Jane Doe")).await.unwrap();
    assert!(result.success);
    assert!(!result.wms_pushed);
    assert!(!result.mock);
    assert!(result.order_id.starts_with("SMC-"));

    // WRX-yymm-XXXXXX
    let parts: Vec<&str> = result.tracking_number.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "WRX");
    assert_eq!(parts[1].len(), 4);
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));

    let saved = store.get_order(&result.order_id).await.unwrap().unwrap();
    assert_eq!(saved.status, "pending");
    assert_eq!(saved.parcels, 2);
    assert!(!saved.pushed_to_wms);
    assert_eq!(saved.tracking_number.as_deref(), Some(result.tracking_number.as_str()));
}

#[tokio::test]
async fn create_order_live_push_failure_still_persists() {
    let gateway = Arc::new(MockGateway::new(false));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway.clone())).await;

    let result = sync.create_order(order_input("Jane Doe")).await.unwrap();
    assert!(result.success);
    assert!(!result.wms_pushed);
    assert_eq!(gateway.last_operation().as_deref(), Some("UpsertFulfilmentRequest"));

    let saved = store.get_order(&result.order_id).await.unwrap().unwrap();
    assert!(!saved.pushed_to_wms);

    // the failed push is on the audit trail
    let audit = AuditLog::new(store.clone());
    let entries = audit.recent(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].success);
    assert_eq!(entries[0].operation, "UpsertFulfilmentRequest");
}

#[tokio::test]
async fn create_order_live_success_marks_pushed() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway)).await;

    let result = sync.create_order(order_input("Jane Doe")).await.unwrap();
    assert!(result.wms_pushed);

    let saved = store.get_order(&result.order_id).await.unwrap().unwrap();
    assert!(saved.pushed_to_wms);
    assert!(saved.wms_response.is_some());
}

#[tokio::test]
async fn cancel_order_refused_remotely_leaves_status_unchanged() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway.clone())).await;

    let created = sync.create_order(order_input("Jane Doe")).await.unwrap();

    gateway.set_succeed(false);
    let cancel = sync.cancel_order(&created.order_id).await.unwrap();
    assert!(!cancel.success);
    assert!(cancel.error.is_some());

    let order = store.get_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "pending");
}

#[tokio::test]
async fn cancel_order_confirmed_remotely_fails_the_order() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway.clone())).await;

    let created = sync.create_order(order_input("Jane Doe")).await.unwrap();
    let cancel = sync.cancel_order(&created.order_id).await.unwrap();
    assert!(cancel.success);
    assert_eq!(gateway.last_operation().as_deref(), Some("CancelSalesOrder"));

    let order = store.get_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "failed");
}

#[tokio::test]
async fn cancel_is_rejected_outside_the_cancellation_window() {
    let (sync, _store, _dir) = sync_service(SyncMode::Local, None).await;

    let created = sync.create_order(order_input("Jane Doe")).await.unwrap();
    let patch = OrderPatch {
        status: Some("allocated".into()),
        ..Default::default()
    };
    sync.update_order(&created.order_id, &patch).await.unwrap();
    let patch = OrderPatch {
        status: Some("in_transit".into()),
        ..Default::default()
    };
    sync.update_order(&created.order_id, &patch).await.unwrap();

    let err = sync.cancel_order(&created.order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn allocate_assigns_and_reallocate_advances() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;
    let created = sync.create_order(order_input("Jane Doe")).await.unwrap();

    sync.allocate_order(&created.order_id, "Marcus Chen").await.unwrap();
    let order = store.get_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "allocated");
    assert_eq!(order.driver_id.as_deref(), Some("Marcus Chen"));

    // allocating again moves the order out the door
    sync.allocate_order(&created.order_id, "Marcus Chen").await.unwrap();
    let order = store.get_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "in_transit");
}

#[tokio::test]
async fn terminal_orders_reject_status_changes_but_accept_proof() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;
    let created = sync.create_order(order_input("Jane Doe")).await.unwrap();

    for status in ["allocated", "in_transit", "delivered"] {
        let patch = OrderPatch {
            status: Some(status.into()),
            ..Default::default()
        };
        sync.update_order(&created.order_id, &patch).await.unwrap();
    }

    let err = sync
        .update_order(
            &created.order_id,
            &OrderPatch {
                status: Some("pending".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // proof and notes still land after delivery
    sync.update_order(
        &created.order_id,
        &OrderPatch {
            delivery_notes: Some("left at door".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let order = store.get_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "delivered");
    assert_eq!(order.delivery_notes.as_deref(), Some("left at door"));
}

#[tokio::test]
async fn run_create_complete_and_cancel_cascades() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;

    let a = sync.create_order(order_input("Jane Doe")).await.unwrap();
    let b = sync.create_order(order_input("Tom Smith")).await.unwrap();
    let order_ids = vec![a.order_id.clone(), b.order_id.clone()];

    let run = sync
        .create_run("Inner West", "DRV-101", "Marcus Chen", &order_ids)
        .await
        .unwrap();
    assert!(run.run_id.starts_with("RUN-"));
    assert!(run.run_id.ends_with("-001"));

    // allocation cascade writes the display name into driver_id
    for oid in &order_ids {
        let order = store.get_order(oid).await.unwrap().unwrap();
        assert_eq!(order.status, "allocated");
        assert_eq!(order.driver_id.as_deref(), Some("Marcus Chen"));
    }

    let members = store.get_run_orders(&run.run_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].order_id, a.order_id);
    assert_eq!(members[1].order_id, b.order_id);

    sync.complete_run(&run.run_id).await.unwrap();
    let stored = store.get_run(&run.run_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "completed");
    assert_eq!(stored.completed, 2);
    for oid in &order_ids {
        let order = store.get_order(oid).await.unwrap().unwrap();
        assert_eq!(order.status, "delivered");
    }

    // runs are one-way: no cancelling a completed run
    let err = sync.cancel_run(&run.run_id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn cancelling_a_run_returns_members_to_pending() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;

    let a = sync.create_order(order_input("Jane Doe")).await.unwrap();
    let run = sync
        .create_run("CBD", "DRV-102", "Sarah Thompson", &[a.order_id.clone()])
        .await
        .unwrap();

    sync.cancel_run(&run.run_id).await.unwrap();
    let stored = store.get_run(&run.run_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "cancelled");
    let order = store.get_order(&a.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "pending");
}

#[tokio::test]
async fn runs_refuse_members_that_are_not_pending() {
    let (sync, store, _dir) = sync_service(SyncMode::Local, None).await;

    let done = sync.create_order(order_input("Jane Doe")).await.unwrap();
    sync.create_run("CBD", "DRV-101", "Marcus Chen", &[done.order_id.clone()])
        .await
        .unwrap();
    let patch = OrderPatch {
        status: Some("delivered".into()),
        ..Default::default()
    };
    sync.update_order(&done.order_id, &patch).await.unwrap();

    // a terminal order must not be resurrected by the allocation cascade
    let fresh = sync.create_order(order_input("Tom Smith")).await.unwrap();
    let err = sync
        .create_run(
            "CBD",
            "DRV-102",
            "Sarah Thompson",
            &[fresh.order_id.clone(), done.order_id.clone()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let untouched = store.get_order(&done.order_id).await.unwrap().unwrap();
    assert_eq!(untouched.status, "delivered");
    let pending = store.get_order(&fresh.order_id).await.unwrap().unwrap();
    assert_eq!(pending.status, "pending");
    assert!(pending.driver_id.is_none());
}

#[tokio::test]
async fn run_ids_count_up_within_a_day() {
    let (sync, _store, _dir) = sync_service(SyncMode::Local, None).await;

    let a = sync.create_order(order_input("Jane Doe")).await.unwrap();
    let b = sync.create_order(order_input("Tom Smith")).await.unwrap();

    let first = sync
        .create_run("CBD", "DRV-101", "Marcus Chen", &[a.order_id])
        .await
        .unwrap();
    let second = sync
        .create_run("CBD", "DRV-101", "Marcus Chen", &[b.order_id])
        .await
        .unwrap();
    assert!(first.run_id.ends_with("-001"));
    assert!(second.run_id.ends_with("-002"));
}

#[tokio::test]
async fn demo_mode_touches_neither_store_nor_gateway() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Demo, Some(gateway.clone())).await;

    let result = sync.create_order(order_input("Jane Doe")).await.unwrap();
    assert!(result.mock);
    assert_eq!(gateway.call_count(), 0);
    assert!(store.get_orders().await.unwrap().is_empty());

    // demo reads serve synthetic data
    assert_eq!(sync.get_orders().await.unwrap().len(), 50);
    assert_eq!(sync.get_drivers().await.unwrap().len(), 10);
    assert!(!sync.get_runs().await.unwrap().is_empty());
}

#[tokio::test]
async fn live_only_passthroughs_mock_outside_live() {
    let (sync, _store, _dir) = sync_service(SyncMode::Local, None).await;

    let result = sync.destroy_uld("ULD-0001").await.unwrap();
    assert!(result.success);
    assert!(result.mock);

    let result = sync.test_wms_connection().await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("WMS not configured"));
}

#[tokio::test]
async fn live_passthroughs_are_audited() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway.clone())).await;

    let result = sync.move_uld("ULD-0001", "A-01-02").await.unwrap();
    assert!(result.success);
    assert!(!result.mock);
    assert_eq!(gateway.last_operation().as_deref(), Some("MoveULD"));

    let audit = AuditLog::new(store.clone());
    let entries = audit.recent(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, "MoveULD");
    assert!(entries[0].endpoint.ends_with("/MoveULD/"));
}

#[tokio::test]
async fn delete_item_is_externally_authoritative_in_live_mode() {
    let gateway = Arc::new(MockGateway::new(true));
    let (sync, store, _dir) = sync_service(SyncMode::Live, Some(gateway.clone())).await;

    let item: courier_server::store::models::ItemUpsert =
        serde_json::from_value(serde_json::json!({"item_code": "WID-1"})).unwrap();
    sync.upsert_item(item).await.unwrap();

    gateway.set_succeed(false);
    let refused = sync.delete_item("WID-1").await.unwrap();
    assert!(!refused.success);
    assert_eq!(store.get_items().await.unwrap().len(), 1);

    gateway.set_succeed(true);
    let confirmed = sync.delete_item("WID-1").await.unwrap();
    assert!(confirmed.success);
    assert!(store.get_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_order_input_is_rejected() {
    let (sync, _store, _dir) = sync_service(SyncMode::Local, None).await;

    let mut bad = order_input("Jane Doe");
    bad.parcels = 0;
    assert!(matches!(
        sync.create_order(bad).await.unwrap_err(),
        AppError::Validation(_)
    ));

    let mut bad = order_input("");
    bad.parcels = 1;
    assert!(matches!(
        sync.create_order(bad).await.unwrap_err(),
        AppError::Validation(_)
    ));
}
