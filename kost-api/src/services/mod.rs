//! Service Layer
//!
//! Business logic behind the HTTP routes: the read and batch paths, the
//! write and invalidation path, and the statistics aggregator. Route handlers
//! only translate between DTOs and these calls.

mod availability_service;
mod stats_service;

pub use availability_service::AvailabilityService;
