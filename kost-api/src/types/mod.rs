//! API Request and Response Types
//!
//! Wire types for the REST API. Domain types from `kost-core` never cross the
//! HTTP boundary directly.

// Single-property availability types
mod availability;
pub use availability::*;

// Batch lookup types
mod batch;
pub use batch::*;

// Statistics types
mod stats;
pub use stats::*;
