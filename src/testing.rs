//! Shared fixtures for in-crate tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::channels::web::server::{GatewayState, build_router};
use crate::db::memory::MemoryBackend;
use crate::db::{Database, PageLimits};
use crate::practice::access::AccessPolicy;
use crate::practice::seed::seed_store;
use crate::practice::session::issue_token;

/// A memory store loaded with the demo firm.
pub(crate) async fn seeded_store() -> Arc<dyn Database> {
    let store: Arc<dyn Database> = Arc::new(MemoryBackend::new());
    seed_store(store.as_ref()).await.expect("seed data loads");
    store
}

pub(crate) async fn test_state() -> Arc<GatewayState> {
    Arc::new(GatewayState {
        store: seeded_store().await,
        access: AccessPolicy::default(),
        page_limits: PageLimits::default(),
        latency: Duration::from_millis(1),
        shutdown_tx: tokio::sync::RwLock::new(None),
        serve_task: tokio::sync::Mutex::new(None),
        startup_time: Instant::now(),
    })
}

pub(crate) async fn test_router() -> Router {
    build_router(test_state().await)
}

pub(crate) fn owner_token() -> String {
    issue_token(1)
}

pub(crate) fn lawyer_token() -> String {
    issue_token(2)
}

pub(crate) fn assistant_token() -> String {
    issue_token(3)
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

async fn dispatch(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse { status, body }
}

fn request_builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Send a JSON request through the router.
pub(crate) async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let builder = request_builder(method, uri, token);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");
    dispatch(app, request).await
}

/// Send a pre-encoded body with an explicit content type.
pub(crate) async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    content_type: &str,
    body: &str,
) -> TestResponse {
    let request = request_builder(method, uri, token)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .expect("request builds");
    dispatch(app, request).await
}
