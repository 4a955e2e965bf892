use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_ID_LEN: usize = 64;

/// Runs the request inside a span tagged with its request id and logs the outcome.
///
/// A well-formed `x-request-id` from the caller is kept; otherwise a fresh
/// UUID is issued. The id is echoed on the response either way.
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = inbound_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("http", %method, %path, request_id = %request_id);
    let started = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let report = response.extensions_mut().remove::<ErrorReport>();

    span.in_scope(|| match report {
        Some(report) if report.status.is_server_error() => error!(
            status,
            elapsed_ms,
            source = report.source,
            chain = ?report.messages,
            "request failed"
        ),
        Some(report) if report.status.is_client_error() => warn!(
            status,
            elapsed_ms,
            source = report.source,
            detail = report.messages.first().map(String::as_str).unwrap_or(""),
            "request rejected"
        ),
        _ => debug!(status, elapsed_ms, "request served"),
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn inbound_request_id(request: &Request<Body>) -> Option<String> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !raw.is_empty()
        && raw.len() <= MAX_INBOUND_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    valid.then(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(id: &str) -> Request<Body> {
        Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn caller_request_id_is_kept_when_well_formed() {
        assert_eq!(
            inbound_request_id(&request_with("edge-7f3a.1")).as_deref(),
            Some("edge-7f3a.1")
        );
    }

    #[test]
    fn malformed_request_id_is_replaced() {
        assert_eq!(inbound_request_id(&request_with("has space")), None);
        assert_eq!(inbound_request_id(&request_with(&"a".repeat(65))), None);
        assert_eq!(inbound_request_id(&request_with("")), None);
    }
}
