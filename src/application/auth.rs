//! Login, logout and bearer-token authentication.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::repos::UsersRepo;
use crate::domain::types::Role;
use crate::infra::security::{Claims, JwtKeys, PasswordHashing, TokenError};

pub const CREDENTIALS_MISMATCH: &str = "Oops, your credentials does not match our records";
pub const TOKEN_MISSING: &str = "Access token could not be found";

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on anything; members only on what they own.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// A verified bearer token together with the principal it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub claims: Claims,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBody {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

impl TokenResponse {
    fn new(access_token: String, minutes: i64) -> Self {
        Self {
            token: TokenBody {
                access_token,
                token_type: "bearer",
                expires_in: format!("{minutes} minutes"),
            },
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    jwt: Arc<JwtKeys>,
    passwords: PasswordHashing,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, jwt: Arc<JwtKeys>, passwords: PasswordHashing) -> Self {
        Self {
            users,
            jwt,
            passwords,
        }
    }

    pub fn passwords(&self) -> &PasswordHashing {
        &self.passwords
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AppError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found(CREDENTIALS_MISMATCH))?;

        let matches = self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        if !matches {
            warn!(user_id = user.id, "login rejected: password mismatch");
            return Err(AppError::not_found(CREDENTIALS_MISMATCH));
        }

        let (token, _) = self
            .jwt
            .issue(user.id, Role::from_is_admin(user.is_admin))
            .map_err(|err| AppError::unexpected(err.to_string()))?;

        info!(user_id = user.id, "user logged in");
        Ok(TokenResponse::new(token, self.jwt.ttl_minutes()))
    }

    pub fn logout(&self, session: &Session) {
        self.jwt.revoke(&session.claims);
        info!(user_id = session.principal.user_id, "user logged out");
    }

    pub fn check(&self, session: &Session) -> TokenResponse {
        TokenResponse::new(session.token.clone(), session.claims.remaining_minutes())
    }

    /// Resolves a bearer token to a live user. The role comes from storage,
    /// not from the token claims.
    pub async fn authenticate(&self, token: &str) -> Result<Session, AppError> {
        let claims = self.jwt.verify(token).map_err(|err| match err {
            TokenError::Expired => AppError::unauthorized("Access token has expired"),
            TokenError::Revoked | TokenError::Invalid(_) => {
                AppError::unauthorized("Access token is invalid")
            }
            TokenError::Signing(err) => AppError::unexpected(err.to_string()),
        })?;

        let user = self
            .users
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Access token is invalid"))?;

        Ok(Session {
            principal: Principal {
                user_id: user.id,
                role: Role::from_is_admin(user.is_admin),
            },
            claims,
            token: token.to_string(),
        })
    }
}
