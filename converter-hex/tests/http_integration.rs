//! Integration tests for the HTTP surface.
//!
//! These tests drive the full router (auth, rate limiting, handlers) against
//! an in-memory SQLite repository and deterministic exchange rates.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use converter_hex::{ConverterService, inbound::HttpServer};
use converter_repo::SqliteRepo;
use exchange_rates::FixedRateProvider;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Helper to create a test server with the given rate limit.
async fn create_test_server(requests_per_minute: u32) -> HttpServer<SqliteRepo, FixedRateProvider> {
    // Use in-memory SQLite for tests
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    let service = ConverterService::new(repo, FixedRateProvider::new());
    HttpServer::with_rate_limit(service, requests_per_minute)
}

fn json_request(method: Method, uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {}", key));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {}", key));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Bootstraps the first user and returns its API key.
async fn bootstrap_api_key(app: &Router, email: &str) -> String {
    let (status, json) = send(
        app,
        json_request(Method::POST, "/api/bootstrap", None, json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["api_key"].as_str().unwrap().to_string()
}

/// Registers a second user through the staff endpoint and returns its API key.
async fn register(app: &Router, staff_key: &str, email: &str) -> String {
    let (status, json) = send(
        app,
        json_request(Method::POST, "/api/users", Some(staff_key), json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["api_key"].as_str().unwrap().to_string()
}

async fn create_converter(app: &Router, key: &str, email: &str, code: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/converter/create/",
            Some(key),
            json!({ "title": "Wallet", "code": code, "converter_user": email }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_server(100).await.router();

    let (status, json) = send(&app, get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_bootstrap_only_once() {
    let app = create_test_server(100).await.router();
    bootstrap_api_key(&app, "admin@example.com").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/bootstrap",
            None,
            json!({ "email": "other@example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["bootstrap"].is_array());
}

#[tokio::test]
async fn test_missing_and_invalid_keys_are_unauthorized() {
    let app = create_test_server(100).await.router();
    bootstrap_api_key(&app, "admin@example.com").await;

    let (status, json) = send(&app, get_request("/api/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"], "Authentication credentials were not provided.");

    let (status, json) = send(&app, get_request("/api/users/me", Some("sk_nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"], "Invalid API key.");
}

#[tokio::test]
async fn test_me_returns_the_caller() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "Admin@Example.com").await;

    let (status, json) = send(&app, get_request("/api/users/me", Some(&key))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], "admin@example.com");
    assert_eq!(json["is_staff"], true);
}

#[tokio::test]
async fn test_create_detail_convert_flow() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    let (status, created) = create_converter(&app, &key, "admin@example.com", "usd").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "USD");
    assert_eq!(created["converter_user"], "admin@example.com");

    let id = created["id"].as_str().unwrap();
    let (status, detail) = send(&app, get_request(&format!("/converter/{}/", id), Some(&key))).await;
    assert_eq!(status, StatusCode::OK);

    let rates = detail["rate"].as_array().unwrap();
    let codes: Vec<_> = rates.iter().map(|r| r["code"].as_str().unwrap()).collect();
    assert_eq!(codes, vec!["GBP", "EUR", "CNY"]);
    assert_eq!(rates[2]["currency_rate"], "7.220217");

    let (status, result) = send(
        &app,
        json_request(
            Method::POST,
            "/converter/get_rate/",
            Some(&key),
            json!({ "base_currency": "USD", "target_currency": "cny", "amount": 200 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["converter"], "200 USD = 1444.043400 CNY");
}

#[tokio::test]
async fn test_create_rejections_are_field_keyed() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    let (status, json) = create_converter(&app, &key, "admin@example.com", "AMD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["wrong_code"][0], "Only currently supported currencies may be used.");

    let (status, _) = create_converter(&app, &key, "admin@example.com", "EUR").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = create_converter(&app, &key, "admin@example.com", "eur").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["unique_code"].is_array());

    let (status, json) = create_converter(&app, &key, "someone@example.com", "GBP").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["converter_user"][0],
        "Object with email=someone@example.com does not exist."
    );

    register(&app, &key, "bob@example.com").await;
    let (status, json) = create_converter(&app, &key, "bob@example.com", "GBP").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["converter_user"][0], "You specified another user.");
}

#[tokio::test]
async fn test_create_uniqueness_is_per_declared_user() {
    let app = create_test_server(100).await.router();
    let admin = bootstrap_api_key(&app, "admin@example.com").await;
    let bob = register(&app, &admin, "bob@example.com").await;
    let (status, _) = create_converter(&app, &bob, "bob@example.com", "USD").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = create_converter(&app, &admin, "bob@example.com", "USD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["unique_code"].is_array());
    assert!(json.get("converter_user").is_none());
}

#[tokio::test]
async fn test_body_field_errors_are_field_keyed() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;
    create_converter(&app, &key, "admin@example.com", "USD").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/converter/create/",
            Some(&key),
            json!({ "title": "Wallet", "converter_user": "admin@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "code": ["This field is required."] }));

    for amount in [json!(2.5), json!("ten")] {
        let (status, json) = send(
            &app,
            json_request(
                Method::POST,
                "/converter/get_rate/",
                Some(&key),
                json!({ "base_currency": "USD", "target_currency": "EUR", "amount": amount }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "amount": ["A valid integer is required."] }));
    }

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/converter/get_rate/",
            Some(&key),
            json!({ "base_currency": "USD", "target_currency": "CNY", "amount": "200" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["converter"], "200 USD = 1444.043400 CNY");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/converter/create/")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", key))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].is_string());
}

#[tokio::test]
async fn test_other_users_converter_is_forbidden() {
    let app = create_test_server(100).await.router();
    let admin = bootstrap_api_key(&app, "admin@example.com").await;
    let bob = register(&app, &admin, "bob@example.com").await;

    let (_, created) = create_converter(&app, &admin, "admin@example.com", "GBP").await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(&app, get_request(&format!("/converter/{}/", id), Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/converter/update/{}/", id),
            Some(&bob),
            json!({ "code": "GBP" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Bob may hold his own GBP converter.
    let (status, _) = create_converter(&app, &bob, "bob@example.com", "GBP").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_refreshes_rates() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;
    let (_, created) = create_converter(&app, &key, "admin@example.com", "GBP").await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/converter/update/{}/", id),
            Some(&key),
            json!({ "code": "USD" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["wrong_code"].is_array());

    let (status, json) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/converter/update/{}/", id),
            Some(&key),
            json!({ "code": "gbp" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rate"].as_array().unwrap().len(), 3);
    assert_eq!(json["id"], created["id"]);
}

#[tokio::test]
async fn test_update_accepts_any_added_code() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;
    let (_, created) = create_converter(&app, &key, "admin@example.com", "GBP").await;
    create_converter(&app, &key, "admin@example.com", "USD").await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/converter/update/{}/", id),
            Some(&key),
            json!({ "code": "usd" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);
    assert_eq!(json["code"], "GBP");
    let codes: Vec<_> = json["rate"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["USD", "EUR", "CNY"]);
}

#[tokio::test]
async fn test_unknown_converter_is_not_found() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    for uri in ["/converter/not-an-id/", "/converter/0b9d2a5e-7d55-4c47-9f2a-2a8a3f1e9b10/"] {
        let (status, json) = send(&app, get_request(uri, Some(&key))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "Not found.");
    }
}

#[tokio::test]
async fn test_convert_without_converter() {
    let app = create_test_server(100).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/converter/get_rate/",
            Some(&key),
            json!({ "base_currency": "EUR", "target_currency": "USD", "amount": 5 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["converter_user"].is_array());
}

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    // Bootstrap counts against the "anonymous" key, so the API key gets the full quota.
    let app = create_test_server(3).await.router();
    let key = bootstrap_api_key(&app, "admin@example.com").await;

    for i in 1..=3 {
        let (status, _) = send(&app, get_request("/api/users/me", Some(&key))).await;
        assert_eq!(status, StatusCode::OK, "request {} should pass", i);
    }

    let (status, json) = send(&app, get_request("/api/users/me", Some(&key))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(json["detail"].as_str().unwrap().contains("Rate limit exceeded"));
    let retry_after = json["retry_after_seconds"].as_u64().unwrap();
    assert!((1..=20).contains(&retry_after), "got {}", retry_after);
}

#[tokio::test]
async fn test_rate_limiting_health_endpoint_bypassed() {
    let app = create_test_server(1).await.router();

    for _ in 0..10 {
        let (status, _) = send(&app, get_request("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
