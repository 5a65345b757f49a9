//! Kost Storage
//!
//! The durable property store is consumed through [`PropertyRepository`];
//! [`InMemoryPropertyRepository`] backs tests, demos and the default binary.
//! [`AvailabilityCache`] sits in front of the store and never serves a record
//! older than the newest version written through this process.

pub mod cache;
pub mod clock;
pub mod memory;
pub mod repository;

pub use cache::{AvailabilityCache, CacheEntry, CacheStats, SingleFlight, VersionJournal};
pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::InMemoryPropertyRepository;
pub use repository::{FetchOutcome, PropertyRepository};
