//! Durable property store interface.

use async_trait::async_trait;
use std::collections::HashMap;

use kost_core::{AvailabilityKey, AvailabilityRecord, AvailabilityWindow, PropertyId, StoreError};

/// Per-id answer inside a batched fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(AvailabilityRecord),
    NotFound,
    /// The store could not produce this id; other ids are unaffected.
    Failed(String),
}

/// Source of truth for availability records.
///
/// Implementations own versioning: every successful [`persist`] returns the
/// stored record carrying a version strictly greater than any version
/// previously returned for the same property.
///
/// [`persist`]: PropertyRepository::persist
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Fetch one record. `Ok(None)` means the property does not exist.
    ///
    /// A windowed key returns the window-specific record when the store keeps
    /// one and the property-wide record otherwise.
    async fn fetch_one(&self, key: &AvailabilityKey) -> Result<Option<AvailabilityRecord>, StoreError>;

    /// Fetch many records in one round trip.
    ///
    /// Ids absent from the returned map are treated by callers as failures.
    async fn fetch_many(
        &self,
        ids: &[PropertyId],
        window: Option<AvailabilityWindow>,
    ) -> Result<HashMap<PropertyId, FetchOutcome>, StoreError>;

    /// Store a new property-wide state and return it with its new version.
    async fn persist(&self, record: AvailabilityRecord) -> Result<AvailabilityRecord, StoreError>;

    /// Every property id known to the store.
    async fn list_ids(&self) -> Result<Vec<PropertyId>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
