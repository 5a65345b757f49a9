//! Sharded availability cache.

use std::future::Future;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use kost_core::{AvailabilityKey, AvailabilityRecord, CacheConfig, ConfigError, PropertyId, StoreError};

use super::entry::CacheEntry;
use super::journal::VersionJournal;
use super::shard::{Lookup, Shard};
use super::single_flight::{FlightRole, SingleFlight};
use super::stats::{CacheCounters, CacheStats};
use crate::clock::Clock;

/// Outcome of loading one record from the store.
pub type LoadResult = Result<Option<AvailabilityRecord>, StoreError>;

/// In-memory availability cache.
///
/// Constructed explicitly and shared by reference (usually behind an `Arc`);
/// there is no process-wide instance.
pub struct AvailabilityCache {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
    journal: VersionJournal,
    flights: SingleFlight<AvailabilityKey, LoadResult>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    capacity: usize,
    counters: CacheCounters,
    closed: AtomicBool,
}

impl std::fmt::Debug for AvailabilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityCache")
            .field("shards", &self.shards.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl AvailabilityCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let shards = (0..config.shard_count)
            .map(|index| Mutex::new(Shard::new(config.shard_capacity(index))))
            .collect();
        Ok(Self {
            shards,
            hasher: RandomState::new(),
            journal: VersionJournal::new(),
            flights: SingleFlight::new(),
            clock,
            ttl: config.entry_ttl,
            capacity: config.capacity,
            counters: CacheCounters::default(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard(&self, property_id: &PropertyId) -> MutexGuard<'_, Shard> {
        let index = (self.hasher.hash_one(property_id) as usize) % self.shards.len();
        lock_shard(&self.shards[index])
    }

    /// Cached record for `key`, if present and still valid.
    ///
    /// Expired and superseded entries are removed when observed.
    pub fn get(&self, key: &AvailabilityKey) -> Option<AvailabilityRecord> {
        let now = self.clock.now();
        let lookup = {
            let mut shard = self.shard(&key.property_id);
            let known = self.journal.known_version(&key.property_id);
            shard.lookup(key, now, known)
        };
        match lookup {
            Lookup::Hit(record) => {
                CacheCounters::bump(&self.counters.hits);
                Some(record)
            }
            Lookup::Stale => {
                CacheCounters::bump(&self.counters.stale_drops);
                CacheCounters::bump(&self.counters.misses);
                None
            }
            Lookup::Miss => {
                CacheCounters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Insert or overwrite the entry for `key`.
    ///
    /// Refused (returns `false`) when the cache is shut down or the record's
    /// version is older than the newest version known for the property.
    pub fn put(&self, key: AvailabilityKey, record: AvailabilityRecord) -> bool {
        if self.is_closed() {
            return false;
        }
        let now = self.clock.now();
        let evicted = {
            let mut shard = self.shard(&key.property_id);
            // Checked under the shard lock: a concurrent invalidation either
            // sees this entry or has already journaled a version that rejects it.
            let known = self.journal.known_version(&key.property_id);
            if record.version < known {
                drop(shard);
                CacheCounters::bump(&self.counters.rejected_puts);
                tracing::debug!(
                    key = %key,
                    version = record.version,
                    known_version = known,
                    "Discarding superseded cache put"
                );
                return false;
            }
            shard.insert(CacheEntry::new(key, record, now, self.ttl))
        };
        CacheCounters::add(&self.counters.evictions, evicted);
        true
    }

    /// Remove every cached window of a property and abandon its in-flight loads.
    pub fn invalidate(&self, property_id: &PropertyId) -> usize {
        let removed = self.shard(property_id).remove_property(property_id);
        let abandoned = self
            .flights
            .abandon_where(|key| &key.property_id == property_id);
        CacheCounters::bump(&self.counters.invalidations);
        tracing::debug!(
            property_id = %property_id,
            removed,
            abandoned,
            "Invalidated property cache entries"
        );
        removed
    }

    /// Remove everything.
    pub fn invalidate_all(&self) -> usize {
        let removed: usize = self.shards.iter().map(|s| lock_shard(s).clear()).sum();
        self.flights.abandon_all();
        CacheCounters::bump(&self.counters.invalidations);
        tracing::info!(removed, "Cleared availability cache");
        removed
    }

    /// Record a version persisted by the store.
    ///
    /// Must be called before [`invalidate`](Self::invalidate) on the write path.
    pub fn record_version(&self, property_id: &PropertyId, version: u64) -> u64 {
        self.journal.record(property_id, version)
    }

    pub fn known_version(&self, property_id: &PropertyId) -> u64 {
        self.journal.known_version(property_id)
    }

    /// Drop expired and superseded entries from every shard.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let purged: usize = self
            .shards
            .iter()
            .map(|s| lock_shard(s).purge(now, |id| self.journal.known_version(id)))
            .sum();
        CacheCounters::add(&self.counters.stale_drops, purged as u64);
        purged
    }

    /// Cached record or a store load, coalesced with concurrent loads of the same key.
    ///
    /// Found records are cached (subject to the version check in
    /// [`put`](Self::put)). Not-found results and errors are shared with
    /// followers but never cached. Followers whose flight is abandoned load
    /// on their own.
    pub async fn get_or_load<F, Fut>(&self, key: &AvailabilityKey, load: F) -> LoadResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult>,
    {
        if let Some(record) = self.get(key) {
            return Ok(Some(record));
        }

        match self.flights.join(key.clone()) {
            FlightRole::Leader(flight) => {
                let result = load().await;
                self.populate(key, &result);
                flight.complete(result.clone());
                result
            }
            FlightRole::Follower(mut rx) => {
                CacheCounters::bump(&self.counters.coalesced_loads);
                match rx.recv().await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::debug!(key = %key, "In-flight load abandoned, loading directly");
                        let result = load().await;
                        self.populate(key, &result);
                        result
                    }
                }
            }
        }
    }

    fn populate(&self, key: &AvailabilityKey, result: &LoadResult) {
        if let Ok(Some(record)) = result {
            self.put(key.clone(), record.clone());
        }
    }

    /// Clear all entries and refuse further puts.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let removed = self.invalidate_all();
            tracing::info!(removed, "Availability cache shut down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| lock_shard(s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len() as u64, self.capacity as u64)
    }
}

/// Lock a shard, discarding its contents if a previous holder panicked.
fn lock_shard(shard: &Mutex<Shard>) -> MutexGuard<'_, Shard> {
    match shard.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            let dropped = guard.clear();
            shard.clear_poison();
            tracing::warn!(dropped, "Recovered poisoned cache shard");
            guard
        }
    }
}
