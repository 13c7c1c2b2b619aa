//! Append-only trail of outbound gateway calls
//!
//! Recording is side-channel only: a failed append is logged and
//! swallowed so it can never roll back the operation it describes.

use std::sync::Arc;

use crate::store::EntityStore;
use crate::store::models::{ApiLogEntry, ApiLogRecord};
use crate::wms::WmsOutcome;

const SUMMARY_MAX: usize = 200;
const RESPONSE_MAX: usize = 2000;
const DEFAULT_WINDOW: i64 = 100;

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn EntityStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Append one record for a gateway call. Best-effort.
    pub async fn record(&self, operation: &str, endpoint: &str, summary: &str, outcome: &WmsOutcome) {
        let record = ApiLogRecord {
            operation: operation.to_string(),
            endpoint: endpoint.to_string(),
            request_summary: truncate(summary, SUMMARY_MAX),
            success: outcome.success,
            status_code: outcome.status_code,
            response_body: outcome.response_text().map(|t| truncate(&t, RESPONSE_MAX)),
            error_message: outcome.error.clone(),
        };
        if let Err(e) = self.store.append_api_log(&record).await {
            tracing::warn!(operation, "Failed to append audit record: {e}");
        }
    }

    /// Most recent records, newest first. `limit` defaults to 100.
    pub async fn recent(&self, limit: Option<i64>) -> crate::store::StoreResult<Vec<ApiLogEntry>> {
        self.store
            .recent_api_log(limit.unwrap_or(DEFAULT_WINDOW).max(0))
            .await
    }

    pub async fn clear(&self) -> crate::store::StoreResult<()> {
        self.store.clear_api_log().await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use tempfile::TempDir;

    async fn test_store() -> (Arc<dyn EntityStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.db");
        let store = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
        (Arc::new(store), dir)
    }

    #[tokio::test]
    async fn summary_and_response_are_truncated() {
        let (store, _dir) = test_store().await;
        let audit = AuditLog::new(store);

        let outcome = WmsOutcome {
            success: true,
            status_code: Some(200),
            response: Some(serde_json::Value::String("y".repeat(5000))),
            error: None,
        };
        audit
            .record("UpsertFulfilmentRequest", "/UpsertFulfilmentRequest/", &"x".repeat(1000), &outcome)
            .await;

        let entries = audit.recent(None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].request_summary.chars().count(), 200);
        assert_eq!(entries[0].response_body.as_ref().unwrap().chars().count(), 2000);
        assert!(entries[0].success);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_bounded() {
        let (store, _dir) = test_store().await;
        let audit = AuditLog::new(store);

        for i in 0..5 {
            let outcome = WmsOutcome::failure(format!("err {i}"));
            audit.record(&format!("Op{i}"), "/x/", "req", &outcome).await;
        }

        let entries = audit.recent(Some(3)).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].operation, "Op4");
        assert_eq!(entries[2].operation, "Op2");
    }

    #[tokio::test]
    async fn clear_empties_the_trail() {
        let (store, _dir) = test_store().await;
        let audit = AuditLog::new(store);

        audit.record("Op", "/x/", "req", &WmsOutcome::failure("boom")).await;
        audit.clear().await.unwrap();
        assert!(audit.recent(None).await.unwrap().is_empty());
    }
}
