//! OpenAPI Specification for the kost API
//!
//! Generated by utoipa from the route annotations and DTO derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{availability, health, stats};
use crate::types::*;

use kost_core::BatchStatus;

/// OpenAPI document for the kost API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "kost availability API",
        description = "Cached room availability for rental properties",
    ),
    paths(
        availability::batch_availability,
        availability::get_availability,
        availability::update_availability,
        availability::clear_property_cache,
        availability::clear_all_caches,
        stats::get_stats,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        AvailabilityResponse,
        UpdateAvailabilityRequest,
        BatchAvailabilityRequest,
        BatchAvailabilityResponse,
        BatchItemResult<AvailabilityResponse>,
        BatchStatus,
        StatsResponse,
        CacheStatsResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    )),
    tags(
        (name = "Availability", description = "Room availability reads, updates and cache control"),
        (name = "Health", description = "Liveness and readiness checks"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_routes() -> Result<(), String> {
        let openapi = ApiDoc::openapi();

        for path in [
            "/properties/availability",
            "/properties/{property_id}/availability",
            "/properties/{property_id}/availability/cache",
            "/availability/cache",
            "/availability/stats",
            "/health/ready",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.security_schemes.contains_key("api_key"));
        assert!(components.schemas.contains_key("AvailabilityResponse"));
        assert!(components.schemas.contains_key("StatsResponse"));
        Ok(())
    }

    #[test]
    fn test_timestamps_are_documented_as_date_time_strings() -> Result<(), String> {
        let doc = serde_json::to_value(ApiDoc::openapi()).map_err(|e| e.to_string())?;
        let schemas = &doc["components"]["schemas"];

        for (schema, field) in [
            ("AvailabilityResponse", "as_of"),
            ("StatsResponse", "generated_at"),
        ] {
            let property = &schemas[schema]["properties"][field];
            assert_eq!(property["type"], "string", "{}.{}", schema, field);
            assert_eq!(property["format"], "date-time", "{}.{}", schema, field);
        }
        Ok(())
    }
}
