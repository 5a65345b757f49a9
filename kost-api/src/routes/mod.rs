//! REST API Routes Module
//!
//! - Availability reads, batch lookups, updates and cache clearing
//! - Aggregate statistics
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for browser-based clients

pub mod availability;
pub mod health;
pub mod stats;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    Router,
};
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::middleware::{identity_middleware, IdentityState, API_KEY_HEADER};
use crate::state::AppState;

pub use availability::create_router as availability_router;
pub use health::create_router as health_router;
pub use stats::create_router as stats_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// - Availability and stats routes carry the identity middleware
/// - Health checks at /health/* (no identity)
/// - OpenAPI spec at /openapi.json, Swagger UI at /swagger-ui (feature gated)
///
/// # Middleware Order (outer to inner)
/// 1. Tracing
/// 2. CORS - handles preflight requests
/// 3. Concurrency limit
/// 4. Request timeout (408)
/// 5. Identity (API routes only)
///
/// In production, refuses to build without API keys.
pub fn create_api_router(state: AppState, api_config: &ApiConfig, auth_config: AuthConfig) -> ApiResult<Router> {
    auth_config.validate_for_production(api_config.is_production())?;
    if api_config.is_production() && api_config.cors_origins.is_empty() {
        tracing::warn!("CORS origins not configured in production - allowing all origins");
    }

    let identity = IdentityState::new(auth_config);
    let api_routes = Router::new()
        .merge(availability_router())
        .merge(stats_router())
        .layer(from_fn_with_state(identity, identity_middleware));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(api_routes)
        .nest("/health", health_router());

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", axum::routing::get(openapi_json));
    }

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
        .layer(GlobalConcurrencyLimitLayer::new(api_config.max_concurrent_requests))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            api_config.request_timeout,
        ));

    Ok(router.with_state(state).layer(middleware))
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// Otherwise only the configured origins are allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Restricted mode - allowing origins: {:?}",
            config.cors_origins
        );
        let allowed = config.clone();
        let origins = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| allowed.is_origin_allowed(origin))
                .unwrap_or(false)
        });

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
