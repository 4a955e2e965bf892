//! Request extractors: bearer authentication, validated JSON and image uploads.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::application::auth::{Principal, Session, TOKEN_MISSING};

use super::error::ApiError;
use super::state::AppState;

const IMAGE_FIELD: &str = "image";

/// A caller holding a valid, unrevoked access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Session);

impl AuthUser {
    pub fn principal(&self) -> &Principal {
        &self.0.principal
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError::token(TOKEN_MISSING))?;
        let session = state.auth.authenticate(token).await?;
        Ok(Self(session))
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Session);

impl AdminUser {
    pub fn principal(&self) -> &Principal {
        &self.0.principal
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(session) = AuthUser::from_request_parts(parts, state).await?;
        if !session.principal.is_admin() {
            return Err(ApiError::forbidden(
                "You are not allowed to access this resource",
            ));
        }
        Ok(Self(session))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// JSON body that has passed its declarative validation rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// The raw bytes of the multipart `image` field.
#[derive(Debug, Clone)]
pub struct ImageUpload(pub Bytes);

impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::upload(rejection.status(), rejection.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::upload(err.status(), err.body_text()))?
        {
            if field.name() != Some(IMAGE_FIELD) {
                continue;
            }
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::upload(err.status(), err.body_text()))?;
            return Ok(Self(data));
        }

        Err(ApiError::field(IMAGE_FIELD, "The image field is required"))
    }
}
