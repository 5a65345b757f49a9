//! Availability REST API Routes
//!
//! Reads are open to every requester. Updates and cache clearing go through
//! the service's authorization hook.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use kost_core::PropertyId;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequesterExtractor;
use crate::services::AvailabilityService;
use crate::state::AppState;
use crate::types::{
    AvailabilityResponse, BatchAvailabilityRequest, BatchAvailabilityResponse,
    UpdateAvailabilityRequest, WindowQuery,
};

fn parse_property_id(raw: String) -> ApiResult<PropertyId> {
    PropertyId::new(raw).map_err(ApiError::from)
}

/// POST /properties/availability - Availability of many properties
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/properties/availability",
    tag = "Availability",
    request_body = BatchAvailabilityRequest,
    responses(
        (status = 200, description = "Per-property results, possibly with partial failures", body = BatchAvailabilityResponse),
        (status = 400, description = "Invalid ids, window or batch size", body = ApiError),
        (status = 401, description = "Unknown API key (the key is optional on reads)", body = ApiError),
    ),
))]
pub async fn batch_availability(
    State(state): State<AppState>,
    Json(req): Json<BatchAvailabilityRequest>,
) -> ApiResult<Json<BatchAvailabilityResponse>> {
    let (ids, window) = req.parse(state.max_batch_size)?;
    let batch = state.service.get_many(&ids, window).await?;
    Ok(Json(batch.into()))
}

/// GET /properties/{property_id}/availability - Availability of one property
///
/// Open to anonymous callers. A request that does send `X-API-Key` must send
/// a known one.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/properties/{property_id}/availability",
    tag = "Availability",
    params(
        ("property_id" = String, Path, description = "Property ID"),
        WindowQuery,
    ),
    responses(
        (status = 200, description = "Current availability", body = AvailabilityResponse),
        (status = 400, description = "Invalid window", body = ApiError),
        (status = 401, description = "Unknown API key (the key is optional on reads)", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError),
        (status = 503, description = "Store unavailable", body = ApiError),
    ),
))]
pub async fn get_availability(
    State(service): State<Arc<AvailabilityService>>,
    Path(property_id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let property_id = parse_property_id(property_id)?;
    let record = service.get(&property_id, window.into_window()?).await?;
    Ok(Json(record.into()))
}

/// PUT /properties/{property_id}/availability - Change room counts
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/properties/{property_id}/availability",
    tag = "Availability",
    params(
        ("property_id" = String, Path, description = "Property ID"),
    ),
    request_body = UpdateAvailabilityRequest,
    responses(
        (status = 200, description = "Stored availability with its new version", body = AvailabilityResponse),
        (status = 400, description = "Room counts violate available <= total", body = ApiError),
        (status = 401, description = "Requester may not update this property", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError),
        (status = 503, description = "Store unavailable, nothing was changed", body = ApiError),
    ),
    security(("api_key" = [])),
))]
pub async fn update_availability(
    State(service): State<Arc<AvailabilityService>>,
    Path(property_id): Path<String>,
    RequesterExtractor(requester): RequesterExtractor,
    Json(req): Json<UpdateAvailabilityRequest>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let property_id = parse_property_id(property_id)?;
    let stored = service
        .update_availability(&property_id, req.into(), &requester)
        .await?;
    Ok(Json(stored.into()))
}

/// DELETE /properties/{property_id}/availability/cache - Drop cached entries of a property
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/properties/{property_id}/availability/cache",
    tag = "Availability",
    params(
        ("property_id" = String, Path, description = "Property ID"),
    ),
    responses(
        (status = 204, description = "Cached entries dropped"),
        (status = 401, description = "Requester may not clear this cache", body = ApiError),
    ),
    security(("api_key" = [])),
))]
pub async fn clear_property_cache(
    State(service): State<Arc<AvailabilityService>>,
    Path(property_id): Path<String>,
    RequesterExtractor(requester): RequesterExtractor,
) -> ApiResult<StatusCode> {
    let property_id = parse_property_id(property_id)?;
    service.clear_cache(&property_id, &requester)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /availability/cache - Drop the whole cache
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/availability/cache",
    tag = "Availability",
    responses(
        (status = 204, description = "Cache cleared"),
        (status = 401, description = "Only admins may clear the whole cache", body = ApiError),
    ),
    security(("api_key" = [])),
))]
pub async fn clear_all_caches(
    State(service): State<Arc<AvailabilityService>>,
    RequesterExtractor(requester): RequesterExtractor,
) -> ApiResult<StatusCode> {
    service.clear_all(&requester)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/properties/availability", post(batch_availability))
        .route(
            "/properties/:property_id/availability",
            get(get_availability).put(update_availability),
        )
        .route(
            "/properties/:property_id/availability/cache",
            delete(clear_property_cache),
        )
        .route("/availability/cache", delete(clear_all_caches))
}
