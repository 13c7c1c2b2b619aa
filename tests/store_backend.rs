//! SQLite backend contract: upserts, migrations, the roster aggregate,
//! transactional run creation, and token row plumbing.

mod common;

use chrono::Utc;
use courier_server::store::EntityStore;
use courier_server::store::models::{Driver, Order, Run, Zone};
use courier_server::store::sqlite::SqliteStore;
use tempfile::TempDir;

use common::sqlite_store;

fn order(order_id: &str, tracking: &str) -> Order {
    let now = Utc::now();
    Order {
        order_id: order_id.to_string(),
        tracking_number: Some(tracking.to_string()),
        customer: "Jane Doe".into(),
        email: None,
        phone: None,
        address: "1 King St".into(),
        suburb: "Surry Hills".into(),
        state: "NSW".into(),
        postcode: "2010".into(),
        zone: None,
        service_level: "standard".into(),
        parcels: 1,
        status: "pending".into(),
        driver_id: None,
        special_instructions: None,
        proof_photo: None,
        proof_signature: None,
        delivery_notes: None,
        delivered_at: None,
        pushed_to_wms: false,
        wms_response: None,
        order_date: now.format("%Y-%m-%d").to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn run(run_id: &str, stops: i64) -> Run {
    let now = Utc::now();
    Run {
        run_id: run_id.to_string(),
        zone: "CBD".into(),
        driver_id: "DRV-101".into(),
        driver_name: "Marcus Chen".into(),
        status: "active".into(),
        total_stops: stops,
        completed: 0,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn save_order_is_an_idempotent_upsert() {
    let (store, _dir) = sqlite_store().await;

    let mut o = order("SMC-11111", "WRX-2608-AAAAAA");
    store.save_order(&o).await.unwrap();

    o.customer = "Jane A. Doe".into();
    o.parcels = 3;
    store.save_order(&o).await.unwrap();

    let all = store.get_orders().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].customer, "Jane A. Doe");
    assert_eq!(all[0].parcels, 3);
}

#[tokio::test]
async fn tracking_number_survives_upsert() {
    let (store, _dir) = sqlite_store().await;

    let mut o = order("SMC-11112", "WRX-2608-BBBBBB");
    store.save_order(&o).await.unwrap();

    o.tracking_number = Some("WRX-2608-FFFFFF".into());
    store.save_order(&o).await.unwrap();

    let saved = store.get_order("SMC-11112").await.unwrap().unwrap();
    assert_eq!(saved.tracking_number.as_deref(), Some("WRX-2608-BBBBBB"));
    assert!(store.tracking_number_exists("WRX-2608-BBBBBB").await.unwrap());
    assert!(!store.tracking_number_exists("WRX-2608-FFFFFF").await.unwrap());
}

#[tokio::test]
async fn reopening_the_same_file_is_harmless() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reopen.db");
    let path = path.to_str().unwrap();

    {
        let store = SqliteStore::open(path).await.unwrap();
        store.save_order(&order("SMC-11113", "WRX-2608-CCCCCC")).await.unwrap();
    }

    // second open re-runs schema and column migrations
    let store = SqliteStore::open(path).await.unwrap();
    let saved = store.get_order("SMC-11113").await.unwrap().unwrap();
    assert_eq!(saved.tracking_number.as_deref(), Some("WRX-2608-CCCCCC"));
}

#[tokio::test]
async fn run_creation_is_transactional() {
    let (store, _dir) = sqlite_store().await;
    store.save_order(&order("SMC-11114", "WRX-2608-DDDDDD")).await.unwrap();

    let result = store
        .create_run_with_orders(
            &run("RUN-260830-001", 2),
            &["SMC-11114".to_string(), "SMC-99999".to_string()],
        )
        .await;
    assert!(result.is_err());

    // nothing from the failed transaction is visible
    assert!(store.get_run("RUN-260830-001").await.unwrap().is_none());
    let untouched = store.get_order("SMC-11114").await.unwrap().unwrap();
    assert_eq!(untouched.status, "pending");
    assert!(untouched.driver_id.is_none());
}

#[tokio::test]
async fn run_progress_clamps_to_stop_count() {
    let (store, _dir) = sqlite_store().await;
    store.save_order(&order("SMC-11115", "WRX-2608-EEEEEE")).await.unwrap();
    store
        .create_run_with_orders(&run("RUN-260830-002", 1), &["SMC-11115".to_string()])
        .await
        .unwrap();

    store.update_run_progress("RUN-260830-002", 10).await.unwrap();
    let r = store.get_run("RUN-260830-002").await.unwrap().unwrap();
    assert_eq!(r.completed, 1);

    store.update_run_progress("RUN-260830-002", -4).await.unwrap();
    let r = store.get_run("RUN-260830-002").await.unwrap().unwrap();
    assert_eq!(r.completed, 0);
}

#[tokio::test]
async fn roster_aggregates_come_from_orders() {
    let (store, _dir) = sqlite_store().await;

    let driver = Driver {
        driver_id: "DRV-200".into(),
        name: "Sarah Thompson".into(),
        vehicle_type: "Van".into(),
        plate: "ABC-123".into(),
        status: "available".into(),
        current_zone: "CBD".into(),
        phone: "0400000200".into(),
        deliveries_today: 0,
        success_rate: 0.95,
        rating: 4.5,
        active_orders: 0,
        latitude: None,
        longitude: None,
        location_updated_at: None,
        created_at: Utc::now(),
    };
    store.save_driver(&driver).await.unwrap();

    let mut active = order("SMC-11116", "WRX-2608-111111");
    active.status = "in_transit".into();
    active.driver_id = Some("DRV-200".into());
    store.save_order(&active).await.unwrap();

    let mut done = order("SMC-11117", "WRX-2608-222222");
    done.status = "delivered".into();
    done.driver_id = Some("DRV-200".into());
    store.save_order(&done).await.unwrap();

    let mut failed = order("SMC-11118", "WRX-2608-333333");
    failed.status = "failed".into();
    failed.driver_id = Some("DRV-200".into());
    store.save_order(&failed).await.unwrap();

    let roster = store.get_drivers().await.unwrap();
    assert_eq!(roster.len(), 1);
    let row = &roster[0];
    assert_eq!(row.active_orders, 1);
    assert_eq!(row.deliveries_today, 1);
    assert!((row.success_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn zones_seed_once_and_only_when_empty() {
    let (store, _dir) = sqlite_store().await;

    store.seed_default_zones().await.unwrap();
    let seeded = store.get_zones().await.unwrap();
    assert!(!seeded.is_empty());

    store.delete_zone(&seeded[0].zone_name).await.unwrap();
    store
        .save_zone(&Zone {
            zone_name: "Custom".into(),
            suburbs: "Somewhere".into(),
        })
        .await
        .unwrap();

    // reseeding must not resurrect the deleted zone
    store.seed_default_zones().await.unwrap();
    let after = store.get_zones().await.unwrap();
    assert_eq!(after.len(), seeded.len());
    assert!(after.iter().any(|z| z.zone_name == "Custom"));
    assert!(!after.iter().any(|z| z.zone_name == seeded[0].zone_name));
}

#[tokio::test]
async fn settings_round_trip_and_overwrite() {
    let (store, _dir) = sqlite_store().await;

    assert!(store.get_setting("theme").await.unwrap().is_none());
    store.set_setting("theme", "dark").await.unwrap();
    store.set_setting("theme", "light").await.unwrap();
    assert_eq!(store.get_setting("theme").await.unwrap().as_deref(), Some("light"));

    store.set_setting("lang", "en").await.unwrap();
    let all = store.get_all_settings().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn order_status_update_requires_an_existing_row() {
    let (store, _dir) = sqlite_store().await;
    let err = store
        .update_order_status("SMC-00000", "allocated", None)
        .await
        .unwrap_err();
    assert!(matches!(err, courier_server::store::StoreError::NotFound(_)));
}
