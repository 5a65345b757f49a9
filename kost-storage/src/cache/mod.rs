//! Availability cache with version-checked invalidation.
//!
//! An entry is served only while it is younger than its TTL **and** its
//! version is at least the newest version the [`VersionJournal`] has seen for
//! the property. Writes record their new version in the journal before
//! invalidating, so an in-flight fetch that started before a write can never
//! repopulate the cache with pre-write state.
//!
//! Entries are spread over independently locked shards by property id, so
//! every window of one property lives in the same shard and per-property
//! invalidation touches a single lock. Each shard evicts least recently used
//! entries when full.
//!
//! Single-property loads go through [`SingleFlight`]: concurrent misses for
//! the same key share one store fetch.

pub mod availability_cache;
pub mod entry;
pub mod journal;
mod shard;
pub mod single_flight;
pub mod stats;

pub use availability_cache::AvailabilityCache;
pub use entry::CacheEntry;
pub use journal::VersionJournal;
pub use single_flight::{FlightRole, SingleFlight};
pub use stats::CacheStats;
