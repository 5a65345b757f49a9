//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::services::AvailabilityService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AvailabilityService>,
    /// Largest batch accepted by `POST /properties/availability`.
    pub max_batch_size: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self {
            max_batch_size: service.config().max_batch_size,
            service,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<AvailabilityService>, service);
