/**
 * Session Tokens
 *
 * Signed (HS256) JWT session tokens. A verified token yields the
 * [`Auth`] the realtime layer caches and filters with.
 */

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::backend::error::AuthError;
use crate::shared::Auth;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Account (tenant) ID
    pub account_id: String,
    pub email: String,
    #[serde(default)]
    pub role: i32,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

impl From<Claims> for Auth {
    fn from(claims: Claims) -> Self {
        Auth::new(claims.account_id, claims.sub, claims.email).with_role(claims.role)
    }
}

/// Issues and verifies session tokens with one HMAC secret
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a token for `auth` valid for `ttl`
    pub fn issue(&self, auth: &Auth, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: auth.user_id.clone(),
            account_id: auth.account_id.clone(),
            email: auth.email.clone(),
            role: auth.role,
            exp: now + ttl.as_secs(),
            iat: now,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify signature and expiry of `token`
    pub fn verify(&self, token: &str) -> Result<Auth, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims.into())
    }
}
