//! Cached availability entries.

use std::time::Duration;

use kost_core::{AvailabilityKey, AvailabilityRecord, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: AvailabilityKey,
    pub value: AvailabilityRecord,
    pub inserted_at: Timestamp,
    pub ttl: Duration,
    /// Store version of `value` at population time.
    pub version: u64,
}

impl CacheEntry {
    pub fn new(key: AvailabilityKey, value: AvailabilityRecord, inserted_at: Timestamp, ttl: Duration) -> Self {
        let version = value.version;
        Self {
            key,
            value,
            inserted_at,
            ttl,
            version,
        }
    }

    /// Whether the TTL has elapsed at `now`.
    ///
    /// A clock that moved backwards keeps the entry alive rather than
    /// expiring it early.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match now.signed_duration_since(self.inserted_at).to_std() {
            Ok(age) => age >= self.ttl,
            Err(_) => false,
        }
    }

    /// Whether the store has moved past this entry's version.
    pub fn is_superseded(&self, known_version: u64) -> bool {
        self.version < known_version
    }

    pub fn is_valid(&self, now: Timestamp, known_version: u64) -> bool {
        !self.is_superseded(known_version) && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use kost_core::PropertyId;

    fn entry(version: u64, ttl: Duration) -> (CacheEntry, Timestamp) {
        let now = Utc::now();
        let id = PropertyId::new("P1").unwrap();
        let record = AvailabilityRecord::new(id.clone(), 10, 4, version).unwrap();
        (CacheEntry::new(AvailabilityKey::property(id), record, now, ttl), now)
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let (entry, t0) = entry(1, Duration::from_secs(30));
        assert!(!entry.is_expired(t0));
        assert!(!entry.is_expired(t0 + TimeDelta::seconds(29)));
        assert!(entry.is_expired(t0 + TimeDelta::seconds(30)));
        assert!(!entry.is_expired(t0 - TimeDelta::seconds(5)));
    }

    #[test]
    fn test_version_check_wins_over_ttl() {
        let (entry, t0) = entry(3, Duration::from_secs(30));
        assert!(entry.is_valid(t0, 3));
        assert!(entry.is_valid(t0, 2));
        assert!(!entry.is_valid(t0, 4));
    }
}
