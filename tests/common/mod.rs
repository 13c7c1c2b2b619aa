//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use courier_server::audit::AuditLog;
use courier_server::store::sqlite::SqliteStore;
use courier_server::store::EntityStore;
use courier_server::sync::{SyncMode, SyncService};
use courier_server::wms::{WmsGateway, WmsOutcome};

/// Scripted gateway: records every call and answers with a canned
/// success or failure.
pub struct MockGateway {
    succeed: AtomicBool,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockGateway {
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed: AtomicBool::new(succeed),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_succeed(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_operation(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(op, _)| op.clone())
    }
}

#[async_trait]
impl WmsGateway for MockGateway {
    async fn post(&self, operation: &str, payload: Value) -> WmsOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), payload));
        if self.succeed.load(Ordering::SeqCst) {
            WmsOutcome {
                success: true,
                status_code: Some(200),
                response: Some(json!({"Result": "OK"})),
                error: None,
            }
        } else {
            WmsOutcome {
                success: false,
                status_code: Some(500),
                response: Some(json!({"Result": "Error"})),
                error: Some("HTTP 500: remote error".to_string()),
            }
        }
    }

    async fn test_connection(&self) -> WmsOutcome {
        WmsOutcome {
            success: self.succeed.load(Ordering::SeqCst),
            status_code: Some(200),
            response: None,
            error: None,
        }
    }
}

pub async fn sqlite_store() -> (Arc<dyn EntityStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let store = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
    (Arc::new(store), dir)
}

/// Sync service over a fresh SQLite store and the given gateway/mode.
pub async fn sync_service(
    mode: SyncMode,
    gateway: Option<Arc<MockGateway>>,
) -> (SyncService, Arc<dyn EntityStore>, TempDir) {
    let (store, dir) = sqlite_store().await;
    let audit = AuditLog::new(store.clone());
    let gateway = gateway.map(|g| g as Arc<dyn WmsGateway>);
    let service = SyncService::new(
        store.clone(),
        gateway,
        audit,
        mode,
        "https://test.dotwms.com/api/1.0".to_string(),
    );
    (service, store, dir)
}
