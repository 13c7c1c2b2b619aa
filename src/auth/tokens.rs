//! Bearer-token issuance and validation
//!
//! Two token families share one mechanism: admin sessions live 7 days,
//! driver sessions 30. Tokens are durable rows in the entity store;
//! the in-process cache is a read optimization and is never consulted
//! without re-checking expiry against the injected clock.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};

use crate::core::error::{AppError, Result};
use crate::store::EntityStore;
use crate::store::models::{DriverToken, SessionToken};

pub const ADMIN_TOKEN_DAYS: i64 = 7;
pub const DRIVER_TOKEN_DAYS: i64 = 30;

/// Time source. Production uses the system clock; tests drive a manual one.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
struct CachedSession {
    username: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct CachedDriver {
    driver_id: String,
    phone: String,
    expires_at: DateTime<Utc>,
}

/// Identity recovered from a validated driver token.
#[derive(Debug, Clone)]
pub struct DriverIdentity {
    pub driver_id: String,
    pub phone: String,
}

pub struct TokenAuthority {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
    sessions: DashMap<String, CachedSession>,
    drivers: DashMap<String, CachedDriver>,
}

impl TokenAuthority {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            rng: SystemRandom::new(),
            sessions: DashMap::new(),
            drivers: DashMap::new(),
        }
    }

    fn generate_token(&self) -> Result<String> {
        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal("Random generator failure".into()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    // === Admin sessions ===

    pub async fn issue_session_token(&self, username: &str) -> Result<SessionToken> {
        let now = self.clock.now();
        let token = SessionToken {
            token: self.generate_token()?,
            username: username.to_string(),
            expires_at: now + Duration::days(ADMIN_TOKEN_DAYS),
            created_at: now,
        };
        self.store.create_session_token(&token).await?;
        self.sessions.insert(
            token.token.clone(),
            CachedSession {
                username: token.username.clone(),
                expires_at: token.expires_at,
            },
        );
        Ok(token)
    }

    /// Resolve a session token to its username, or `None` when the token
    /// is unknown or expired. An expired-but-present row is deleted here
    /// (lazy purge).
    pub async fn validate_session_token(&self, token: &str) -> Result<Option<String>> {
        let now = self.clock.now();

        if let Some(cached) = self.sessions.get(token).map(|e| e.clone()) {
            if cached.expires_at > now {
                return Ok(Some(cached.username));
            }
            self.sessions.remove(token);
            self.store.delete_session_token(token).await?;
            return Ok(None);
        }

        match self.store.get_session_token(token).await? {
            Some(row) if row.expires_at > now => {
                self.sessions.insert(
                    token.to_string(),
                    CachedSession {
                        username: row.username.clone(),
                        expires_at: row.expires_at,
                    },
                );
                Ok(Some(row.username))
            }
            Some(_) => {
                self.store.delete_session_token(token).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn revoke_session_token(&self, token: &str) -> Result<()> {
        self.sessions.remove(token);
        self.store.delete_session_token(token).await?;
        Ok(())
    }

    // === Driver tokens ===

    pub async fn issue_driver_token(&self, driver_id: &str, phone: &str) -> Result<DriverToken> {
        let now = self.clock.now();
        let token = DriverToken {
            token: self.generate_token()?,
            driver_id: driver_id.to_string(),
            phone: phone.to_string(),
            expires_at: now + Duration::days(DRIVER_TOKEN_DAYS),
            created_at: now,
        };
        self.store.create_driver_token(&token).await?;
        self.drivers.insert(
            token.token.clone(),
            CachedDriver {
                driver_id: token.driver_id.clone(),
                phone: token.phone.clone(),
                expires_at: token.expires_at,
            },
        );
        Ok(token)
    }

    pub async fn validate_driver_token(&self, token: &str) -> Result<Option<DriverIdentity>> {
        let now = self.clock.now();

        if let Some(cached) = self.drivers.get(token).map(|e| e.clone()) {
            if cached.expires_at > now {
                return Ok(Some(DriverIdentity {
                    driver_id: cached.driver_id,
                    phone: cached.phone,
                }));
            }
            self.drivers.remove(token);
            self.store.delete_driver_token(token).await?;
            return Ok(None);
        }

        match self.store.get_driver_token(token).await? {
            Some(row) if row.expires_at > now => {
                self.drivers.insert(
                    token.to_string(),
                    CachedDriver {
                        driver_id: row.driver_id.clone(),
                        phone: row.phone.clone(),
                        expires_at: row.expires_at,
                    },
                );
                Ok(Some(DriverIdentity {
                    driver_id: row.driver_id,
                    phone: row.phone,
                }))
            }
            Some(_) => {
                self.store.delete_driver_token(token).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn revoke_driver_token(&self, token: &str) -> Result<()> {
        self.drivers.remove(token);
        self.store.delete_driver_token(token).await?;
        Ok(())
    }

    /// Sweep expired rows from both families. Called eagerly on each
    /// login so stale tokens never accumulate unbounded.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = self.clock.now();
        let sessions = self.store.purge_expired_session_tokens(now).await?;
        let drivers = self.store.purge_expired_driver_tokens(now).await?;
        self.sessions.retain(|_, v| v.expires_at > now);
        self.drivers.retain(|_, v| v.expires_at > now);
        if sessions + drivers > 0 {
            tracing::debug!(sessions, drivers, "Purged expired tokens");
        }
        Ok(sessions + drivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(start) }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    async fn setup() -> (Arc<dyn EntityStore>, Arc<ManualClock>, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.db");
        let store: Arc<dyn EntityStore> =
            Arc::new(SqliteStore::open(path.to_str().unwrap()).await.unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (store, clock, dir)
    }

    #[tokio::test]
    async fn session_token_valid_until_ttl() {
        let (store, clock, _dir) = setup().await;
        let authority = TokenAuthority::new(store, clock.clone());

        let issued = authority.issue_session_token("ops").await.unwrap();
        assert_eq!(
            authority.validate_session_token(&issued.token).await.unwrap(),
            Some("ops".to_string())
        );

        clock.advance(Duration::days(ADMIN_TOKEN_DAYS) + Duration::seconds(1));
        assert_eq!(authority.validate_session_token(&issued.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_token_is_lazily_deleted_from_store() {
        let (store, clock, _dir) = setup().await;
        let authority = TokenAuthority::new(store.clone(), clock.clone());

        let issued = authority.issue_driver_token("DRV-101", "0400000001").await.unwrap();
        clock.advance(Duration::days(DRIVER_TOKEN_DAYS + 1));

        assert!(authority.validate_driver_token(&issued.token).await.unwrap().is_none());
        assert!(store.get_driver_token(&issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_is_not_authoritative_across_instances() {
        let (store, clock, _dir) = setup().await;
        let first = TokenAuthority::new(store.clone(), clock.clone());
        let issued = first.issue_driver_token("DRV-102", "0400000002").await.unwrap();

        // fresh instance with a cold cache still validates from the store
        let second = TokenAuthority::new(store.clone(), clock.clone());
        let identity = second.validate_driver_token(&issued.token).await.unwrap().unwrap();
        assert_eq!(identity.driver_id, "DRV-102");

        // revocation through the second instance removes the durable row
        second.revoke_driver_token(&issued.token).await.unwrap();
        assert!(second.validate_driver_token(&issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_sweeps_both_families() {
        let (store, clock, _dir) = setup().await;
        let authority = TokenAuthority::new(store, clock.clone());

        authority.issue_session_token("ops").await.unwrap();
        authority.issue_driver_token("DRV-103", "0400000003").await.unwrap();
        assert_eq!(authority.purge_expired().await.unwrap(), 0);

        clock.advance(Duration::days(DRIVER_TOKEN_DAYS + 1));
        assert_eq!(authority.purge_expired().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tokens_are_url_safe_and_distinct() {
        let (store, clock, _dir) = setup().await;
        let authority = TokenAuthority::new(store, clock);

        let a = authority.issue_session_token("ops").await.unwrap().token;
        let b = authority.issue_session_token("ops").await.unwrap().token;
        assert_ne!(a, b);
        assert_eq!(a.len(), 43); // 32 bytes, unpadded base64
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
