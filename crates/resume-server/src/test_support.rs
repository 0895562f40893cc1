//! Helpers shared by the router tests.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use resume_shared::Role;
use resume_store::{Database, User};

use crate::api::AppState;
use crate::config::ServerConfig;

pub(crate) fn test_state() -> AppState {
    AppState::new(
        Database::open_in_memory().expect("in-memory database"),
        ServerConfig::default(),
    )
}

/// Insert a user directly (no password hashing) and issue a token for it.
pub(crate) fn seed_user(state: &AppState, username: &str, role: Role) -> (User, String) {
    let user = state
        .db()
        .create_user(username, "unused-hash", role)
        .expect("create user");
    let token = state.tokens.issue(&user).expect("issue token");
    (user, token)
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<(Vec<u8>, Option<&str>)>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some((bytes, content_type)) => {
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            builder.body(Body::from(bytes)).expect("request")
        }
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Send one request and return the raw response.
pub(crate) async fn call_bytes(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, HeaderMap, Bytes) {
    send(app, request(method, uri, token, None)).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, headers, bytes)
}

fn decode(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Send one request through the router and decode the JSON response body
/// (`Value::Null` when the body is empty).
pub(crate) async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = body.map(|json| {
        (
            serde_json::to_vec(&json).expect("encode body"),
            Some("application/json"),
        )
    });
    let (status, _, bytes) = send(app, request(method, uri, token, body)).await;
    (status, decode(&bytes))
}

/// Like [`call`], with the body sent verbatim under `content_type`.
pub(crate) async fn call_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &str,
    content_type: Option<&str>,
) -> (StatusCode, Value) {
    let body = Some((body.as_bytes().to_vec(), content_type));
    let (status, _, bytes) = send(app, request(method, uri, token, body)).await;
    (status, decode(&bytes))
}
