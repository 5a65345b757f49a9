//! Version journal for cache invalidation.
//!
//! Tracks the newest store version observed for each property through the
//! write path. The journal is the cache's watermark: an entry older than the
//! journaled version is stale regardless of its TTL.
//!
//! Entries are never removed. The journal holds one `u64` per property ever
//! written through this process, so its size is bounded by the number of
//! distinct properties, not by cache capacity. Clearing the cache keeps it.

use dashmap::DashMap;

use kost_core::PropertyId;

#[derive(Debug, Default)]
pub struct VersionJournal {
    versions: DashMap<PropertyId, u64>,
}

impl VersionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest version known for the property, zero when never written.
    pub fn known_version(&self, property_id: &PropertyId) -> u64 {
        self.versions.get(property_id).map(|v| *v).unwrap_or(0)
    }

    /// Record a persisted version. Versions only move forward.
    ///
    /// Returns the journaled version after the call.
    pub fn record(&self, property_id: &PropertyId, version: u64) -> u64 {
        let mut entry = self.versions.entry(property_id.clone()).or_insert(0);
        if version > *entry {
            *entry = version;
        }
        *entry
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
