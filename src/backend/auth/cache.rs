/**
 * Auth Cache
 *
 * Sessions resolved from tokens are cached in the pub/sub backend's
 * key/value store under the raw token string, so every process (and the
 * delivery filter inside each subscription) sees the same entry.
 *
 * Entries are populated lazily on first validation, expire after the
 * configured TTL, and are invalidated explicitly when the user's role or
 * password changes.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::auth::sessions::TokenVerifier;
use crate::backend::error::AuthError;
use crate::backend::pubsub::{PubSubBackend, PubSubExt};
use crate::shared::Auth;

/// Resolve the session behind a token
#[async_trait]
pub trait AuthLookup: Send + Sync {
    async fn find_auth_by_token(&self, token: &str) -> Result<Auth, AuthError>;
}

#[derive(Clone)]
pub struct AuthCache {
    backend: Arc<dyn PubSubBackend>,
    verifier: TokenVerifier,
    ttl: Duration,
}

impl AuthCache {
    pub fn new(backend: Arc<dyn PubSubBackend>, verifier: TokenVerifier, ttl: Duration) -> Self {
        Self { backend, verifier, ttl }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Cached session, `AuthError::Missing` when absent or expired
    pub async fn get(&self, token: &str) -> Result<Auth, AuthError> {
        let cached: Result<Auth, _> = self.backend.get_typed(token).await;
        match cached {
            Ok(auth) => Ok(auth),
            Err(e) if e.is_not_found() => Err(AuthError::Missing),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put(&self, token: &str, auth: &Auth) -> Result<(), AuthError> {
        self.backend.set_typed(token, auth, Some(self.ttl)).await?;
        Ok(())
    }

    /// Forget a session (role or password changed)
    pub async fn invalidate(&self, token: &str) -> Result<(), AuthError> {
        self.backend.delete(token).await?;
        tracing::info!("[Auth] Session invalidated");
        Ok(())
    }

    /// Verify `token` and cache the resulting session
    pub async fn authenticate(&self, token: &str) -> Result<Auth, AuthError> {
        let auth = self.verifier.verify(token)?;
        self.put(token, &auth).await?;
        tracing::debug!("[Auth] Cached session for user {}", auth.user_id);
        Ok(auth)
    }
}

#[async_trait]
impl AuthLookup for AuthCache {
    /// Cache hit, otherwise verify and populate
    async fn find_auth_by_token(&self, token: &str) -> Result<Auth, AuthError> {
        match self.get(token).await {
            Ok(auth) => Ok(auth),
            Err(AuthError::Missing) => self.authenticate(token).await,
            Err(e) => Err(e),
        }
    }
}
