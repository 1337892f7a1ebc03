mod common;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use lynx_shortener::routes::app_router;
use lynx_shortener::state::AppState;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tower::ServiceExt;

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(addr));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const FRONTEND: &str = "http://localhost:3000";

fn router(
    state: AppState,
) -> tower_http::normalize_path::NormalizePath<axum::Router> {
    app_router(state, &[FRONTEND.to_string()])
}

fn preflight(uri: &str, origin: &str) -> Request<Body> {
    let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    Request::builder()
        .method("OPTIONS")
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,authorization")
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_with_trailing_slash() {
    let app = common::test_app();
    let response = router(app.state.clone())
        .oneshot(request("GET", "/health/", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_create_then_redirect() {
    let app = common::test_app();

    let created = router(app.state.clone())
        .oneshot(request(
            "POST",
            "/api/urls",
            Some(json!({ "long_url": "https://example.com/routed", "short_code": "routed1" })),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let redirect = router(app.state.clone())
        .oneshot(request("GET", "/urls/routed1", None))
        .await
        .unwrap();
    assert_eq!(redirect.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        redirect.headers()[header::LOCATION],
        "https://example.com/routed"
    );
}

#[tokio::test]
async fn test_protected_group_requires_bearer() {
    let app = common::test_app();
    let response = router(app.state.clone())
        .oneshot(request("GET", "/v1/api/urls", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = common::test_app();
    let response = router(app.state.clone())
        .oneshot(request("GET", "/nope/at/all", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() {
    let app = common::test_app();
    let response = router(app.state.clone())
        .oneshot(preflight("/v1/auth/login", FRONTEND))
        .await
        .unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_preflight_from_unknown_origin_is_not_allowed() {
    let app = common::test_app();
    let response = router(app.state.clone())
        .oneshot(preflight("/v1/auth/login", "https://evil.example"))
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_simple_request_carries_allow_origin() {
    let app = common::test_app();
    let mut req = request("GET", "/health", None);
    req.headers_mut()
        .insert(header::ORIGIN, FRONTEND.parse().unwrap());

    let response = router(app.state.clone()).oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        FRONTEND
    );
}
