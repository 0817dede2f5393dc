pub mod cookies;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Seconds before `exp` at which an access token is treated as expired and
/// refreshed ahead of use.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// Claims carried by a provider-issued access token. Only the fields this
/// service reads are modelled; everything else in the token is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, session_id: String, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email,
            role: Some("authenticated".to_string()),
            session_id: Some(session_id),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_within(&self, margin_secs: i64) -> bool {
        self.exp <= Utc::now().timestamp() + margin_secs
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    Invalid(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &[u8]) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret);
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry. Used by backends that own the signing key.
pub fn verify_jwt(token: &str, secret: &[u8]) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| JwtError::Invalid(e.to_string()))?;

    Ok(token_data.claims)
}

/// Read claims without checking the signature or expiry.
///
/// This is only good for deciding *when* to refresh; identity must still be
/// confirmed with the provider.
pub fn peek_claims(token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| JwtError::Invalid(e.to_string()))?;

    Ok(token_data.claims)
}

/// A provider session: opaque refresh token plus short-lived access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: Option<i64>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity record owned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}
