//! Shared harness for kost-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use kost_api::{create_api_router, ApiConfig, AppState, AuthConfig, AvailabilityService, RoleAuthorizer};
use kost_core::{CacheConfig, Role, ServiceConfig};
use kost_storage::{InMemoryPropertyRepository, ManualClock};
use kost_test_utils::fixtures;
use serde_json::Value;
use tower::ServiceExt;

pub const OWNER_KEY: &str = "owner-key";
pub const ADMIN_KEY: &str = "admin-key";
pub const VIEWER_KEY: &str = "viewer-key";

/// Service wired to an in-memory store and a manual clock.
pub struct Harness {
    pub repository: Arc<InMemoryPropertyRepository>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<AvailabilityService>,
}

impl Harness {
    pub fn with(repository: InMemoryPropertyRepository, cache: CacheConfig, service: ServiceConfig) -> Self {
        let repository = Arc::new(repository);
        let clock = Arc::new(ManualClock::default());
        let service = Arc::new(
            AvailabilityService::new(
                repository.clone(),
                Arc::new(RoleAuthorizer),
                clock.clone(),
                cache,
                service,
            )
            .expect("valid test configuration"),
        );
        Self {
            repository,
            clock,
            service,
        }
    }

    /// P1 (10 rooms, 4 free) and P2 (5 rooms, 3 free).
    pub fn two_properties() -> Self {
        Self::with(
            fixtures::two_property_repository(),
            CacheConfig::default().with_capacity(256).with_shard_count(4),
            ServiceConfig::default().with_store_timeout(Duration::from_millis(500)),
        )
    }

    pub fn router(&self) -> Router {
        self.router_with(&ApiConfig::default())
    }

    pub fn router_with(&self, api_config: &ApiConfig) -> Router {
        let auth = AuthConfig::default()
            .with_api_key(OWNER_KEY, "owner-1", Role::Owner)
            .with_api_key(ADMIN_KEY, "admin-1", Role::Admin)
            .with_api_key(VIEWER_KEY, "viewer-1", Role::Viewer);
        create_api_router(AppState::new(self.service.clone()), api_config, auth)
            .expect("router builds in development mode")
    }
}

/// Send one request and decode the JSON body (`Value::Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("valid request")
}

pub fn json_request(method: &str, uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).expect("valid request")
}

pub fn delete(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::delete(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).expect("valid request")
}
