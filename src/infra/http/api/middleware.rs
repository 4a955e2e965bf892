use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tracing::warn;

use super::error::ApiError;
use super::rate_limit::{LOGIN_RATE_LIMITED_TOTAL, RateDecision};
use super::state::AppState;

pub const CLIENT_KEY_HEADER: &str = "x-client-key";

/// Accepted client keys, held as SHA-256 digests.
#[derive(Debug, Default)]
pub struct ClientKeys {
    digests: Vec<Vec<u8>>,
}

impl ClientKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: keys
                .into_iter()
                .map(|key| Sha256::digest(key.as_ref().as_bytes()).to_vec())
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.digests.is_empty()
    }

    /// Compares against every configured key so timing does not reveal
    /// which one matched.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let Some(presented) = presented else {
            return false;
        };

        let digest = Sha256::digest(presented.as_bytes()).to_vec();
        let matched = self
            .digests
            .iter()
            .fold(Choice::from(0), |acc, known| {
                acc | known.as_slice().ct_eq(digest.as_slice())
            });
        matched.into()
    }
}

pub async fn require_client_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(CLIENT_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if !state.client_keys.accepts(presented) {
        warn!(
            path = %request.uri().path(),
            present = presented.is_some(),
            "client key rejected"
        );
        return ApiError::forbidden("The client key is missing or invalid").into_response();
    }

    next.run(request).await
}

pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let caller = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let path = request.uri().path().to_string();

    match state.login_limiter.check(&caller, &path) {
        RateDecision::Allowed { .. } => next.run(request).await,
        RateDecision::Limited { retry_after_secs } => {
            counter!(LOGIN_RATE_LIMITED_TOTAL).increment(1);
            warn!(caller = %caller, retry_after_secs, "login rate limited");
            ApiError::rate_limited(retry_after_secs).into_response()
        }
    }
}
