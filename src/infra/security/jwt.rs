//! HS256 access tokens with server-side revocation.
//!
//! Logout cannot un-sign a JWT, so revoked token ids (`jti`) are kept in a
//! denylist until the token would have expired anyway.

use dashmap::DashMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::Role;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("access token is malformed or has an invalid signature")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("access token has expired")]
    Expired,
    #[error("access token has been revoked")]
    Revoked,
    #[error("failed to sign access token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    /// Whole minutes left before expiry, never negative.
    pub fn remaining_minutes(&self) -> i64 {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        ((self.exp - now).max(0) + 59) / 60
    }
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
    revoked: DashMap<String, i64>,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
            revoked: DashMap::new(),
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    pub fn issue(&self, user_id: i64, role: Role) -> Result<(String, Claims), TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id,
            role: role.as_str().to_string(),
            exp: now + self.ttl_minutes * 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        let token =
            encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)?;
        Ok((token, claims))
    }

    /// Checks signature, expiry, and the revocation list.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(err),
            })?;

        if self.revoked.contains_key(&claims.jti) {
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    pub fn revoke(&self, claims: &Claims) {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(claims.jti.clone(), claims.exp);
    }
}
