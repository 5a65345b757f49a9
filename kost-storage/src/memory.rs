//! In-memory property store with failure injection.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use kost_core::{AvailabilityKey, AvailabilityRecord, AvailabilityWindow, PropertyId, StoreError};

use crate::repository::{FetchOutcome, PropertyRepository};

#[derive(Debug, Clone)]
struct PropertyState {
    base: AvailabilityRecord,
    /// Window-specific room counts; the property version applies to all of them.
    windows: HashMap<AvailabilityWindow, (u32, u32)>,
}

impl PropertyState {
    fn resolve(&self, window: Option<AvailabilityWindow>) -> AvailabilityRecord {
        let mut record = self.base.clone();
        if let Some(window) = window {
            if let Some(&(total_rooms, available_rooms)) = self.windows.get(&window) {
                record.total_rooms = total_rooms;
                record.available_rooms = available_rooms;
            }
            record.window = Some(window);
        }
        record
    }
}

/// Property store kept entirely in memory.
///
/// Besides serving as the default backend it lets tests inject latency,
/// per-property failures, whole-store outages and persist failures, and
/// counts calls so cache behavior can be observed.
#[derive(Debug, Default)]
pub struct InMemoryPropertyRepository {
    properties: DashMap<PropertyId, PropertyState>,
    failing: DashSet<PropertyId>,
    omitted: DashSet<PropertyId>,
    offline: AtomicBool,
    persist_failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    fetch_one_calls: AtomicU64,
    fetch_many_calls: AtomicU64,
    persist_calls: AtomicU64,
}

impl InMemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a property-wide record exactly as given.
    pub fn insert(&self, record: AvailabilityRecord) {
        let property_id = record.property_id.clone();
        let base = AvailabilityRecord {
            window: None,
            ..record
        };
        match self.properties.get_mut(&property_id) {
            Some(mut state) => state.base = base,
            None => {
                self.properties.insert(
                    property_id,
                    PropertyState {
                        base,
                        windows: HashMap::new(),
                    },
                );
            }
        }
    }

    /// Seed window-specific room counts for an existing property.
    pub fn insert_window(
        &self,
        property_id: &PropertyId,
        window: AvailabilityWindow,
        total_rooms: u32,
        available_rooms: u32,
    ) -> Result<(), StoreError> {
        if available_rooms > total_rooms {
            return Err(StoreError::Rejected {
                property_id: property_id.clone(),
                reason: format!("available_rooms {} exceeds total_rooms {}", available_rooms, total_rooms),
            });
        }
        let mut state = self
            .properties
            .get_mut(property_id)
            .ok_or_else(|| StoreError::NotFound(property_id.clone()))?;
        state.windows.insert(window, (total_rooms, available_rooms));
        Ok(())
    }

    pub fn remove(&self, property_id: &PropertyId) -> bool {
        self.properties.remove(property_id).is_some()
    }

    /// Current property-wide record, read without any injected fault.
    pub fn snapshot(&self, property_id: &PropertyId) -> Option<AvailabilityRecord> {
        self.properties.get(property_id).map(|state| state.base.clone())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    // === Fault injection ===

    /// Make reads of one property fail while the rest of the store works.
    pub fn fail_property(&self, property_id: PropertyId) {
        self.failing.insert(property_id);
    }

    /// Leave a property out of batched replies entirely.
    pub fn omit_from_batches(&self, property_id: PropertyId) {
        self.omitted.insert(property_id);
    }

    pub fn heal_property(&self, property_id: &PropertyId) {
        self.failing.remove(property_id);
        self.omitted.remove(property_id);
    }

    /// Make every call fail as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_persist_failing(&self, failing: bool) {
        self.persist_failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every call by `latency` (useful for timeouts and coalescing).
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    // === Call counters ===

    pub fn fetch_one_calls(&self) -> u64 {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_many_calls(&self) -> u64 {
        self.fetch_many_calls.load(Ordering::SeqCst)
    }

    pub fn persist_calls(&self) -> u64 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// Total number of read round trips.
    pub fn read_calls(&self) -> u64 {
        self.fetch_one_calls() + self.fetch_many_calls()
    }

    async fn simulate_io(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                reason: "store offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyRepository for InMemoryPropertyRepository {
    async fn fetch_one(&self, key: &AvailabilityKey) -> Result<Option<AvailabilityRecord>, StoreError> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        if self.failing.contains(&key.property_id) {
            return Err(StoreError::Unreachable {
                reason: format!("read of {} failed", key.property_id),
            });
        }
        Ok(self
            .properties
            .get(&key.property_id)
            .map(|state| state.resolve(key.window)))
    }

    async fn fetch_many(
        &self,
        ids: &[PropertyId],
        window: Option<AvailabilityWindow>,
    ) -> Result<HashMap<PropertyId, FetchOutcome>, StoreError> {
        self.fetch_many_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        let mut reply = HashMap::with_capacity(ids.len());
        for id in ids {
            if self.omitted.contains(id) {
                continue;
            }
            let outcome = if self.failing.contains(id) {
                FetchOutcome::Failed(format!("read of {} failed", id))
            } else {
                match self.properties.get(id) {
                    Some(state) => FetchOutcome::Found(state.resolve(window)),
                    None => FetchOutcome::NotFound,
                }
            };
            reply.insert(id.clone(), outcome);
        }
        Ok(reply)
    }

    async fn persist(&self, record: AvailabilityRecord) -> Result<AvailabilityRecord, StoreError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        if self.persist_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                reason: format!("write of {} failed", record.property_id),
            });
        }
        if let Err(err) = record.validate() {
            return Err(StoreError::Rejected {
                property_id: record.property_id.clone(),
                reason: err.to_string(),
            });
        }

        let mut state = self
            .properties
            .get_mut(&record.property_id)
            .ok_or_else(|| StoreError::NotFound(record.property_id.clone()))?;
        let stored = AvailabilityRecord {
            window: None,
            version: state.base.version + 1,
            as_of: Utc::now(),
            ..record
        };
        state.base = stored.clone();
        Ok(stored)
    }

    async fn list_ids(&self) -> Result<Vec<PropertyId>, StoreError> {
        self.simulate_io().await?;
        let mut ids: Vec<PropertyId> = self.properties.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.simulate_io().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pid(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap()
    }

    fn seeded() -> InMemoryPropertyRepository {
        let repo = InMemoryPropertyRepository::new();
        repo.insert(AvailabilityRecord::new(pid("P1"), 10, 4, 1).unwrap());
        repo.insert(AvailabilityRecord::new(pid("P2"), 5, 3, 1).unwrap());
        repo
    }

    fn window() -> AvailabilityWindow {
        AvailabilityWindow::new(
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 8).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_persist_bumps_version() {
        let repo = seeded();
        let mut next = repo.snapshot(&pid("P1")).unwrap();
        next.available_rooms = 2;

        let stored = repo.persist(next).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.available_rooms, 2);
        assert_eq!(repo.snapshot(&pid("P1")).unwrap().version, 2);
        assert_eq!(repo.persist_calls(), 1);
    }

    #[tokio::test]
    async fn test_persist_rejects_invalid_and_unknown() {
        let repo = seeded();
        let mut bad = repo.snapshot(&pid("P1")).unwrap();
        bad.available_rooms = 11;
        assert!(matches!(repo.persist(bad).await, Err(StoreError::Rejected { .. })));

        let unknown = AvailabilityRecord::new(pid("P9"), 1, 1, 1).unwrap();
        assert!(matches!(repo.persist(unknown).await, Err(StoreError::NotFound(_))));
        assert_eq!(repo.snapshot(&pid("P1")).unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_window_lookup_falls_back_to_base() {
        let repo = seeded();
        repo.insert_window(&pid("P1"), window(), 10, 1).unwrap();

        let key = AvailabilityKey::new(pid("P1"), Some(window()));
        let record = repo.fetch_one(&key).await.unwrap().unwrap();
        assert_eq!(record.available_rooms, 1);
        assert_eq!(record.window, Some(window()));

        let key = AvailabilityKey::new(pid("P2"), Some(window()));
        let record = repo.fetch_one(&key).await.unwrap().unwrap();
        assert_eq!(record.available_rooms, 3);
        assert_eq!(record.window, Some(window()));
    }

    #[tokio::test]
    async fn test_fetch_many_reports_per_item_outcomes() {
        let repo = seeded();
        repo.fail_property(pid("P2"));
        repo.omit_from_batches(pid("P3"));

        let reply = repo
            .fetch_many(&[pid("P1"), pid("P2"), pid("P3"), pid("P4")], None)
            .await
            .unwrap();

        assert!(matches!(reply.get(&pid("P1")), Some(FetchOutcome::Found(_))));
        assert!(matches!(reply.get(&pid("P2")), Some(FetchOutcome::Failed(_))));
        assert!(!reply.contains_key(&pid("P3")));
        assert_eq!(reply.get(&pid("P4")), Some(&FetchOutcome::NotFound));
        assert_eq!(repo.fetch_many_calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let repo = seeded();
        repo.set_offline(true);

        assert!(repo.fetch_one(&AvailabilityKey::property(pid("P1"))).await.is_err());
        assert!(repo.fetch_many(&[pid("P1")], None).await.is_err());
        assert!(repo.list_ids().await.is_err());
        assert!(repo.health_check().await.is_err());

        repo.set_offline(false);
        assert_eq!(repo.list_ids().await.unwrap(), vec![pid("P1"), pid("P2")]);
    }
}
