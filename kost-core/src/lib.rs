//! Kost Core - Availability Types
//!
//! Pure data structures shared by the storage and API crates: identifiers,
//! availability records and windows, batch results, statistics snapshots,
//! access control vocabulary, configuration and the error taxonomy.
//! This crate performs no I/O.

pub mod access;
pub mod availability;
pub mod batch;
pub mod config;
pub mod error;
pub mod identity;
pub mod stats;

pub use access::{Action, Requester, Role};
pub use availability::{AvailabilityKey, AvailabilityRecord, AvailabilityUpdate, AvailabilityWindow};
pub use batch::{BatchItem, BatchResult, BatchStatus};
pub use config::{CacheConfig, ServiceConfig};
pub use error::{AvailabilityError, AvailabilityResult, ConfigError, ErrorKind, StoreError};
pub use identity::{PropertyId, Timestamp};
pub use stats::StatSnapshot;
