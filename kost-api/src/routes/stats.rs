//! Statistics REST API Routes

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::services::AvailabilityService;
use crate::state::AppState;
use crate::types::StatsResponse;

/// GET /availability/stats - Aggregate availability across all properties
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/availability/stats",
    tag = "Availability",
    responses(
        (status = 200, description = "Aggregate snapshot", body = StatsResponse),
        (status = 401, description = "Unknown API key (the key is optional on reads)", body = crate::error::ApiError),
        (status = 503, description = "Property listing unavailable", body = crate::error::ApiError),
    ),
))]
pub async fn get_stats(
    State(service): State<Arc<AvailabilityService>>,
) -> ApiResult<Json<StatsResponse>> {
    let snapshot = service.stats().await?;
    Ok(Json(snapshot.into()))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/availability/stats", get(get_stats))
}
