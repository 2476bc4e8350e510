//! Integration tests for the AuthLatch HTTP server

use authlatch_core::{AuthorizationHolder, ExpiryMode};
use authlatch_server::{router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const EXPIRY: Duration = Duration::from_millis(7000);

fn test_app(mode: ExpiryMode) -> Router {
    let holder = Arc::new(AuthorizationHolder::new(EXPIRY, mode));
    router(AppState::with_debug(holder, true))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn claim(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn query(app: &Router) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth")
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

fn authorized_body() -> Value {
    json!({"message": "Authorized"})
}

fn unauthorized_body() -> Value {
    json!({"error": "Unauthorized"})
}

fn name_required_body() -> Value {
    json!({"error": "Bad Request: name is required"})
}

#[tokio::test(start_paused = true)]
async fn test_fresh_server_is_unauthorized() {
    let app = test_app(ExpiryMode::LatestOnly);

    let (status, body) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorized_body());
}

#[tokio::test(start_paused = true)]
async fn test_claim_query_expire_scenario() {
    let app = test_app(ExpiryMode::LatestOnly);

    let (status, body) = claim(&app, json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, authorized_body());

    let (status, body) = query(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, authorized_body());

    let (status, body) = claim(&app, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, name_required_body());

    // The rejected claim left alice in place
    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(EXPIRY + Duration::from_millis(1)).await;

    let (status, body) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorized_body());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_names_rejected() {
    let app = test_app(ExpiryMode::LatestOnly);

    for body in [
        json!({}),
        json!({"name": ""}),
        json!({"name": null}),
        json!({"name": 7}),
        json!({"name": true}),
        json!({"name": ["alice"]}),
    ] {
        let (status, response) = claim(&app, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(response, name_required_body(), "body {}", body);
    }

    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn test_claim_without_json_content_type() {
    let app = test_app(ExpiryMode::LatestOnly);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth")
        .body(Body::from(r#"{"name":"alice"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, name_required_body());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_json_is_client_error() {
    let app = test_app(ExpiryMode::LatestOnly);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{invalid json}"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Bad Request"));

    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Valid JSON that is not an object gets the same 400 as broken syntax
#[tokio::test(start_paused = true)]
async fn test_non_object_json_body_is_bad_request() {
    let app = test_app(ExpiryMode::LatestOnly);

    for raw in ["null", r#""alice""#, "42", "true"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", raw);
        assert!(
            body["error"].as_str().unwrap().starts_with("Bad Request"),
            "body {}",
            raw
        );
    }

    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_routes_and_methods() {
    let app = test_app(ExpiryMode::LatestOnly);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/auth")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

/// POST alice at t=0, POST bob at t=1s, GET at t=7.5s
#[tokio::test(start_paused = true)]
async fn test_reclaim_race_latest_only() {
    let app = test_app(ExpiryMode::LatestOnly);

    claim(&app, json!({"name": "alice"})).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    claim(&app, json!({"name": "bob"})).await;

    tokio::time::sleep(Duration::from_millis(6500)).await;
    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let (status, _) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn test_reclaim_race_uncancelled() {
    let app = test_app(ExpiryMode::Uncancelled);

    claim(&app, json!({"name": "alice"})).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    claim(&app, json!({"name": "bob"})).await;

    tokio::time::sleep(Duration::from_millis(6500)).await;
    let (status, body) = query(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorized_body());
}

/// Real listener, real clock, short expiry
#[tokio::test]
async fn test_over_tcp_with_reqwest() {
    let holder = Arc::new(AuthorizationHolder::new(
        Duration::from_millis(300),
        ExpiryMode::LatestOnly,
    ));
    let app = router(AppState::new(holder));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to port");
    let addr = listener.local_addr().expect("Failed to get local address");
    let url = format!("http://{}/auth", addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .json(&json!({"name": "alice"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, authorized_body());

    let response = client.get(&url).send().await.expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    tokio::time::sleep(Duration::from_millis(500)).await;

    let response = client.get(&url).send().await.expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, unauthorized_body());
}

#[tokio::test]
async fn test_cors_headers() {
    let app = test_app(ExpiryMode::LatestOnly);

    let request = Request::builder()
        .uri("/auth")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
