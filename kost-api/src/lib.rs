//! Kost API - REST Layer for Property Availability
//!
//! Serves room availability for rental properties over HTTP (Axum). Reads
//! go through an in-process cache in front of the property store; writes go
//! to the store first and then invalidate the cache, so a read issued after
//! a successful write never returns the previous version.

#[macro_use]
mod macros;

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{ApiKeyGrant, AuthConfig, Authorizer, RoleAuthorizer, SharedAuthorizer};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{identity_middleware, IdentityState, RequesterExtractor, API_KEY_HEADER};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::AvailabilityService;
pub use state::AppState;
pub use types::*;
