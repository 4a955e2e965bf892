//! The HTTP surface driven end to end through the router.

mod support;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use inkpost::application::auth::{CREDENTIALS_MISMATCH, TOKEN_MISSING};
use inkpost::cache::InvalidationPolicy;
use inkpost::infra::http::build_router;

use support::{Harness, PASSWORD};

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
    0xDE,
];

fn app(h: &Harness) -> Router {
    build_router(h.app_state(&[]))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/authentications",
            None,
            json!({"email": email, "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["token"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

#[tokio::test]
async fn health_reports_database_state() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let app = app(&h);

    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "message": "Service is healthy"}));

    h.repos.fail_reads(true);
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["error"], "Database");
}

#[tokio::test]
async fn failures_use_the_fail_envelope() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let app = app(&h);

    let (status, body) = send(&app, get("/articles/public", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Query was not found");
    assert_eq!(body["error"], "Model");

    let (status, body) = send(&app, get("/no/such/route", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn dashboard_requires_a_token() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let app = app(&h);

    let (status, body) = send(&app, get("/articles?is_draft=true", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], TOKEN_MISSING);
    assert_eq!(body["error"], "Token");

    let (status, _) = send(&app, get("/articles?is_draft=true", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn client_key_guards_public_reads() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let app = build_router(h.app_state(&["web-client"]));

    let (status, body) = send(&app, get("/articles/public/home", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Authorization");

    let request = Request::builder()
        .uri("/articles/public/home")
        .header("x-client-key", "web-client")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    let app = app(&h);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/authentications",
            None,
            json!({"email": "ana@example.com", "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], CREDENTIALS_MISMATCH);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    let app = app(&h);
    let token = login(&app, "ana@example.com").await;

    let (status, body) = send(&app, get("/authentications/check", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token"]["token_type"], "bearer");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/authentications")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/authentications/check", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn author_creates_and_lists_articles() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    h.repos.seed_category("News", "news");
    let app = app(&h);
    let token = login(&app, "ana@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/articles",
            Some(&token),
            json!({"title": "Hello World", "body": "First post", "category": "news"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["slug"], "hello-world");

    let (status, body) = send(&app, get("/articles?is_draft=false", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["articles_count"], 1);
    assert_eq!(body["data"]["articles"][0]["slug"], "hello-world");

    let (status, body) = send(&app, get("/articles/public/hello-world", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["article"]["title"], "Hello World");
    assert!(body["data"]["article"].get("id").is_none());
}

#[tokio::test]
async fn unknown_category_is_a_validation_error() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    let app = app(&h);
    let token = login(&app, "ana@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/articles",
            Some(&token),
            json!({"title": "Orphan", "body": "text", "category": "missing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation");
    assert!(body["errors"]["category"].is_array());
}

#[tokio::test]
async fn admin_routes_reject_members() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    let app = app(&h);
    let token = login(&app, "ana@example.com").await;

    let (status, body) = send(&app, get("/users", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Authorization");

    let (status, _) = send(&app, get("/articles/cache/flush", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blank_category_name_is_rejected() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("root", true);
    let app = app(&h);
    let token = login(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/categories", Some(&token), json!({"name": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/categories", Some(&token), json!({"name": "Rust"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn admin_flush_empties_the_cache() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let ana = h.user("ana", false);
    h.user("root", true);
    let news = h.repos.seed_category("News", "news");
    h.repos.seed_article(&ana, &news, "story", false);
    let app = app(&h);
    let token = login(&app, "root@example.com").await;

    let (status, _) = send(&app, get("/articles/public?page=1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.cached(h.cache.keys.public_page(1)).await);

    let (status, body) = send(&app, get("/articles/cache/flush", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cache successfully flushed");
    assert!(!h.cached(h.cache.keys.public_page(1)).await);
}

#[tokio::test]
async fn uploaded_images_are_served_back() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    h.user("ana", false);
    let app = app(&h);
    let token = login(&app, "ana@example.com").await;

    let boundary = "inkpost-boundary";
    let mut payload = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"dot.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    payload.extend_from_slice(PNG);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/articles/upload-image")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(payload))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let path = body["data"]["path"].as_str().expect("stored path").to_string();
    assert!(path.starts_with("images/articles/"));
    assert_eq!(
        body["data"]["image_url"],
        format!("http://localhost:3000/{path}")
    );

    let response = app
        .clone()
        .oneshot(get(&format!("/{path}"), None))
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&bytes[..], PNG);

    let (status, _) = send(&app, get("/images/articles/missing.png", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_is_echoed_or_issued() {
    let h = Harness::new(InvalidationPolicy::Surgical);
    let app = app(&h);

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    assert_eq!(response.headers()["x-request-id"], "edge-42");

    let response = app.oneshot(get("/health", None)).await.expect("router is infallible");
    let issued = response.headers()["x-request-id"].to_str().expect("ascii id");
    assert_eq!(issued.len(), 36);
}
