//! Shared application state
//!
//! Built once at startup and cloned into every request handler.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::auth::{AuthService, SystemClock, TokenAuthority};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::store::{self, EntityStore};
use crate::sync::SyncService;
use crate::wms::{WmsClient, WmsGateway};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<dyn EntityStore>,
    pub sync: Arc<SyncService>,
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenAuthority>,
    pub audit: AuditLog,
}

impl ServerState {
    /// Wire up the store, gateway, and services from configuration.
    pub async fn initialize(config: Config) -> Result<Self> {
        let store = store::open_store(&config).await?;
        store.seed_default_zones().await?;

        let audit = AuditLog::new(store.clone());

        let gateway: Option<Arc<dyn WmsGateway>> = if config.wms.is_configured() {
            Some(Arc::new(WmsClient::new(
                config.wms.clone(),
                config.request_timeout_secs,
            )?))
        } else {
            None
        };

        let tokens = Arc::new(TokenAuthority::new(store.clone(), Arc::new(SystemClock)));
        let auth = Arc::new(AuthService::new(store.clone(), tokens.clone()));

        let sync = Arc::new(SyncService::new(
            store.clone(),
            gateway,
            audit.clone(),
            config.data_mode,
            config.wms.base_url(),
        ));

        tracing::info!(mode = config.data_mode.as_str(), "Server state initialized");

        Ok(Self {
            config,
            store,
            sync,
            auth,
            tokens,
            audit,
        })
    }
}
