//! Authentication services
//!
//! Admin accounts authenticate with username + password and receive a
//! 7-day session token; drivers authenticate by phone number through
//! the HTTP API and receive a 30-day token. Both families are issued
//! and validated by the [`TokenAuthority`].

mod password;
mod tokens;

pub use password::{generate_salt, hash_password, verify_password};
pub use tokens::{
    ADMIN_TOKEN_DAYS, Clock, DRIVER_TOKEN_DAYS, DriverIdentity, SystemClock, TokenAuthority,
};

use std::sync::Arc;

use ring::rand::SystemRandom;

use crate::core::error::{AppError, Result};
use crate::store::EntityStore;
use crate::store::models::SessionToken;

pub struct AuthService {
    store: Arc<dyn EntityStore>,
    tokens: Arc<TokenAuthority>,
    rng: SystemRandom,
}

impl AuthService {
    pub fn new(store: Arc<dyn EntityStore>, tokens: Arc<TokenAuthority>) -> Self {
        Self {
            store,
            tokens,
            rng: SystemRandom::new(),
        }
    }

    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Verify admin credentials and issue a session token. The error is
    /// the same for an unknown username and a wrong password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        // each login sweeps expired tokens of both families
        self.tokens.purge_expired().await?;

        let user = self
            .store
            .get_admin_user(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&user.salt, password, &user.password_hash) {
            return Err(AppError::Unauthorized);
        }

        self.tokens.issue_session_token(&user.username).await
    }

    /// Create an admin account and issue its first session token.
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<SessionToken> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("Username and password are required".into()));
        }
        if self.store.get_admin_user(username).await?.is_some() {
            return Err(AppError::Conflict(format!("Admin user '{username}' already exists")));
        }

        let salt = generate_salt(&self.rng)?;
        let hash = hash_password(&salt, password);
        self.store.create_admin_user(username, &hash, &salt).await?;
        tracing::info!(username, "Created admin user");

        self.tokens.issue_session_token(username).await
    }

    pub async fn admin_exists(&self) -> Result<bool> {
        Ok(self.store.admin_user_count().await? > 0)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.tokens.revoke_session_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use tempfile::TempDir;

    async fn service() -> (AuthService, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.db");
        let store: Arc<dyn EntityStore> =
            Arc::new(SqliteStore::open(path.to_str().unwrap()).await.unwrap());
        let tokens = Arc::new(TokenAuthority::new(store.clone(), Arc::new(SystemClock)));
        (AuthService::new(store, tokens), dir)
    }

    #[tokio::test]
    async fn create_then_authenticate() {
        let (auth, _dir) = service().await;
        assert!(!auth.admin_exists().await.unwrap());

        auth.create_admin("ops", "hunter2").await.unwrap();
        assert!(auth.admin_exists().await.unwrap());

        let session = auth.authenticate("ops", "hunter2").await.unwrap();
        assert_eq!(
            auth.tokens().validate_session_token(&session.token).await.unwrap(),
            Some("ops".to_string())
        );
    }

    #[tokio::test]
    async fn username_lookup_is_case_insensitive() {
        let (auth, _dir) = service().await;
        auth.create_admin("Ops", "hunter2").await.unwrap();
        assert!(auth.authenticate("ops", "hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_alike() {
        let (auth, _dir) = service().await;
        auth.create_admin("ops", "hunter2").await.unwrap();

        let wrong = auth.authenticate("ops", "nope").await.unwrap_err();
        let unknown = auth.authenticate("ghost", "nope").await.unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized));
        assert!(matches!(unknown, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn duplicate_admin_is_a_conflict() {
        let (auth, _dir) = service().await;
        auth.create_admin("ops", "hunter2").await.unwrap();
        let err = auth.create_admin("OPS", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let (auth, _dir) = service().await;
        let session = auth.create_admin("ops", "hunter2").await.unwrap();
        auth.logout(&session.token).await.unwrap();
        assert!(
            auth.tokens()
                .validate_session_token(&session.token)
                .await
                .unwrap()
                .is_none()
        );
    }
}
