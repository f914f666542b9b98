#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use usermgmt_api::auth::jwt::JwtConfig;
use usermgmt_api::config::ServerConfig;
use usermgmt_api::router::build_app_router;
use usermgmt_api::state::AppState;

pub const DEVICE_ID: &str = "test-device-1";
pub const DEVICE_UA: &str = "usermgmt-tests/1.0";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: String::new(),
        jwt: JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Build the full application router, with the production middleware stack,
/// over the given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

/// A device tuple to send with a request.
#[derive(Debug, Clone, Copy)]
pub struct TestDevice<'a> {
    pub id: &'a str,
    pub user_agent: &'a str,
}

pub const DEVICE: TestDevice<'static> = TestDevice {
    id: DEVICE_ID,
    user_agent: DEVICE_UA,
};

pub const OTHER_DEVICE: TestDevice<'static> = TestDevice {
    id: "test-device-2",
    user_agent: "other-agent/2.0",
};

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    device: Option<TestDevice<'_>>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(device) = device {
        builder = builder
            .header("x-device-id", device.id)
            .header(header::USER_AGENT, device.user_agent);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, None, Some(body)).await
}

pub async fn post_json_device(
    app: Router,
    uri: &str,
    device: TestDevice<'_>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(device), Some(body)).await
}

pub async fn post_auth_device(
    app: Router,
    uri: &str,
    token: &str,
    device: TestDevice<'_>,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(device), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None, Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), None, Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None, None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
