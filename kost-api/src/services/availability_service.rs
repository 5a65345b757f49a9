//! Read, batch and write paths over the availability cache.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use kost_core::{
    Action, AvailabilityError, AvailabilityKey, AvailabilityRecord, AvailabilityResult,
    AvailabilityUpdate, AvailabilityWindow, BatchItem, BatchResult, CacheConfig, ErrorKind,
    PropertyId, Requester, ServiceConfig, StoreError,
};
use kost_storage::{AvailabilityCache, CacheStats, Clock, FetchOutcome, PropertyRepository};
use tokio::task::JoinHandle;

use super::stats_service::StatsCache;
use crate::auth::Authorizer;

/// Coordinates the cache, the property store and the authorization hook.
///
/// Reads go through the cache. Writes go straight to the store and then
/// invalidate, so a read issued after a write returns at least the written
/// version.
pub struct AvailabilityService {
    repository: Arc<dyn PropertyRepository>,
    cache: Arc<AvailabilityCache>,
    authorizer: Arc<dyn Authorizer>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: ServiceConfig,
    pub(super) stats: StatsCache,
    cache_config: CacheConfig,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AvailabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityService")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("repository", &"<PropertyRepository>")
            .field("authorizer", &"<Authorizer>")
            .finish()
    }
}

impl AvailabilityService {
    pub fn new(
        repository: Arc<dyn PropertyRepository>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
        cache_config: CacheConfig,
        config: ServiceConfig,
    ) -> AvailabilityResult<Self> {
        config.validate()?;
        let cache = AvailabilityCache::new(&cache_config, clock.clone())?;
        Ok(Self {
            repository,
            cache: Arc::new(cache),
            authorizer,
            clock,
            config,
            stats: StatsCache::default(),
            cache_config,
            sweeper: Mutex::new(None),
        })
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Availability of one property, served from the cache when possible.
    #[tracing::instrument(skip_all, fields(property_id = %property_id))]
    pub async fn get(
        &self,
        property_id: &PropertyId,
        window: Option<AvailabilityWindow>,
    ) -> AvailabilityResult<AvailabilityRecord> {
        let key = AvailabilityKey::new(property_id.clone(), window);
        let lookup = &key;
        let loaded = self
            .cache
            .get_or_load(&key, || async move {
                let fetched = self.bounded("fetch_one", self.repository.fetch_one(lookup)).await?;
                match fetched {
                    Some(record) => match record.validate() {
                        Ok(()) => Ok(Some(record)),
                        // An error, so the record is never cached.
                        Err(err) => {
                            tracing::warn!(error = %err, "Store returned an invalid record");
                            Err(StoreError::Unreachable {
                                reason: format!("invalid record from store: {}", err),
                            })
                        }
                    },
                    None => Ok(None),
                }
            })
            .await;

        match loaded {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(AvailabilityError::not_found(property_id.clone())),
            Err(err) => {
                tracing::warn!(error = %err, "Availability lookup failed");
                Err(err.into())
            }
        }
    }

    /// Availability of many properties in one call.
    ///
    /// Ids are de-duplicated keeping their first position. Cache hits are
    /// answered directly and all misses share one batched store call.
    /// Failures are reported per item and never fail the whole batch.
    #[tracing::instrument(skip_all, fields(requested = property_ids.len()))]
    pub async fn get_many(
        &self,
        property_ids: &[PropertyId],
        window: Option<AvailabilityWindow>,
    ) -> AvailabilityResult<BatchResult> {
        let mut seen = HashSet::with_capacity(property_ids.len());
        let ids: Vec<&PropertyId> = property_ids.iter().filter(|id| seen.insert(*id)).collect();

        if ids.len() > self.config.max_batch_size {
            return Err(AvailabilityError::invalid(
                "property_ids",
                format!(
                    "batch of {} properties exceeds the limit of {}",
                    ids.len(),
                    self.config.max_batch_size
                ),
            ));
        }

        let mut resolved: HashMap<PropertyId, Result<AvailabilityRecord, ErrorKind>> =
            HashMap::with_capacity(ids.len());
        let mut misses = Vec::new();
        for id in &ids {
            match self.cache.get(&AvailabilityKey::new((*id).clone(), window)) {
                Some(record) => {
                    resolved.insert((*id).clone(), Ok(record));
                }
                None => misses.push((*id).clone()),
            }
        }

        if !misses.is_empty() {
            let fetched = self
                .bounded("fetch_many", self.repository.fetch_many(&misses, window))
                .await;
            match fetched {
                Ok(mut outcomes) => {
                    for id in misses {
                        let outcome = self.settle(&id, window, outcomes.remove(&id));
                        resolved.insert(id, outcome);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, misses = misses.len(), "Batched fetch failed");
                    for id in misses {
                        resolved.insert(id, Err(ErrorKind::Unavailable));
                    }
                }
            }
        }

        let items = ids
            .into_iter()
            .map(|id| match resolved.remove(id) {
                Some(Ok(record)) => BatchItem::found(id.clone(), record),
                Some(Err(kind)) => BatchItem::failed(id.clone(), kind),
                None => BatchItem::failed(id.clone(), ErrorKind::Unavailable),
            })
            .collect();
        let result = BatchResult::new(items);
        tracing::debug!(
            succeeded = result.succeeded(),
            failed = result.failed(),
            "Batch resolved"
        );
        Ok(result)
    }

    /// Turn one store answer of a batch into an item outcome, caching hits.
    fn settle(
        &self,
        property_id: &PropertyId,
        window: Option<AvailabilityWindow>,
        outcome: Option<FetchOutcome>,
    ) -> Result<AvailabilityRecord, ErrorKind> {
        match outcome {
            Some(FetchOutcome::Found(record)) => match record.validate() {
                Ok(()) => {
                    self.cache
                        .put(AvailabilityKey::new(property_id.clone(), window), record.clone());
                    Ok(record)
                }
                Err(err) => {
                    tracing::warn!(property_id = %property_id, error = %err, "Store returned an invalid record");
                    Err(ErrorKind::Unavailable)
                }
            },
            Some(FetchOutcome::NotFound) => Err(ErrorKind::NotFound),
            Some(FetchOutcome::Failed(reason)) => {
                tracing::warn!(property_id = %property_id, reason = %reason, "Store failed one batch item");
                Err(ErrorKind::Unavailable)
            }
            None => {
                tracing::warn!(property_id = %property_id, "Store omitted a requested id");
                Err(ErrorKind::Unavailable)
            }
        }
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Change the room counts of a property.
    ///
    /// The current state is read from the store, not the cache. Cached entries
    /// are invalidated only after the store accepted the write; a failed or
    /// timed out persist leaves the cache untouched.
    #[tracing::instrument(skip_all, fields(property_id = %property_id, requester = %requester))]
    pub async fn update_availability(
        &self,
        property_id: &PropertyId,
        update: AvailabilityUpdate,
        requester: &Requester,
    ) -> AvailabilityResult<AvailabilityRecord> {
        self.authorize(requester, Action::UpdateAvailability(property_id.clone()))?;

        let key = AvailabilityKey::property(property_id.clone());
        let current = self
            .bounded("fetch_one", self.repository.fetch_one(&key))
            .await?
            .ok_or_else(|| AvailabilityError::not_found(property_id.clone()))?;

        let next = update.apply_to(&current)?;

        let stored = self
            .bounded("persist", self.repository.persist(next))
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "Persist failed, cache left untouched");
                AvailabilityError::from(err)
            })?;

        // Journal first so that loads racing with the invalidation cannot
        // repopulate the cache with the previous version.
        self.cache.record_version(property_id, stored.version);
        self.cache.invalidate(property_id);
        self.stats.invalidate();

        tracing::info!(
            version = stored.version,
            available_rooms = stored.available_rooms,
            total_rooms = stored.total_rooms,
            "Availability updated"
        );
        Ok(stored)
    }

    /// Drop every cached window of one property.
    pub fn clear_cache(&self, property_id: &PropertyId, requester: &Requester) -> AvailabilityResult<usize> {
        self.authorize(requester, Action::ClearPropertyCache(property_id.clone()))?;
        let removed = self.cache.invalidate(property_id);
        self.stats.invalidate();
        tracing::info!(property_id = %property_id, requester = %requester, removed, "Property cache cleared");
        Ok(removed)
    }

    /// Drop the whole cache.
    pub fn clear_all(&self, requester: &Requester) -> AvailabilityResult<usize> {
        self.authorize(requester, Action::ClearAllCaches)?;
        let removed = self.cache.invalidate_all();
        self.stats.invalidate();
        tracing::info!(requester = %requester, removed, "All caches cleared");
        Ok(removed)
    }

    fn authorize(&self, requester: &Requester, action: Action) -> AvailabilityResult<()> {
        if self.authorizer.is_authorized(requester, &action) {
            return Ok(());
        }
        tracing::warn!(requester = %requester, action = %action, "Authorization denied");
        Err(AvailabilityError::Unauthorized {
            requester: requester.to_string(),
            action: action.to_string(),
        })
    }

    // ========================================================================
    // STORE ACCESS
    // ========================================================================

    /// Run a store call under the configured timeout.
    pub(super) async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.store_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
                after: limit,
            }),
        }
    }

    pub(super) async fn list_ids(&self) -> Result<Vec<PropertyId>, StoreError> {
        self.bounded("list_ids", self.repository.list_ids()).await
    }

    /// Check that the store answers.
    pub async fn health(&self) -> Result<(), StoreError> {
        self.bounded("health_check", self.repository.health_check()).await
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Spawn the periodic purge of expired entries. Calling it twice is a no-op.
    pub fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let cache = Arc::clone(&self.cache);
        let period = self.cache_config.sweep_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if cache.is_closed() {
                    break;
                }
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Swept expired cache entries");
                }
            }
        }));
        tracing::debug!(interval = ?period, "Cache sweeper started");
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the sweeper and shut the cache down.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.cache.shutdown();
        self.stats.invalidate();
        tracing::info!("Availability service shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleAuthorizer;
    use kost_core::Role;
    use kost_storage::{InMemoryPropertyRepository, ManualClock};
    use std::time::Duration;

    fn id(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap()
    }

    fn setup() -> (Arc<InMemoryPropertyRepository>, AvailabilityService) {
        let repo = Arc::new(InMemoryPropertyRepository::new());
        repo.insert(AvailabilityRecord::new(id("P1"), 10, 4, 1).unwrap());
        let service = AvailabilityService::new(
            repo.clone(),
            Arc::new(RoleAuthorizer),
            Arc::new(ManualClock::default()),
            CacheConfig::default().with_capacity(64).with_shard_count(4),
            ServiceConfig::default().with_store_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        (repo, service)
    }

    #[tokio::test]
    async fn test_unknown_property_is_not_found() {
        let (_, service) = setup();
        let err = service.get(&id("nope"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_anonymous_write_is_refused_before_store_access() {
        let (repo, service) = setup();
        let err = service
            .update_availability(&id("P1"), AvailabilityUpdate::rooms(1), &Requester::Anonymous)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(repo.read_calls(), 0);
        assert_eq!(repo.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_collapsed() {
        let (repo, service) = setup();
        let ids = vec![id("P1"), id("P1"), id("P1")];
        let result = service.get_many(&ids, None).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(repo.fetch_many_calls(), 1);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_a_validation_error() {
        let (_, service) = setup();
        let ids: Vec<PropertyId> = (0..=service.config().max_batch_size)
            .map(|n| id(&format!("P{}", n)))
            .collect();
        let err = service.get_many(&ids, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_clear_all_requires_admin() {
        let (_, service) = setup();
        let owner = Requester::authenticated("o", Role::Owner);
        let admin = Requester::authenticated("a", Role::Admin);

        service.get(&id("P1"), None).await.unwrap();
        assert_eq!(
            service.clear_all(&owner).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(service.cache().len(), 1);
        assert_eq!(service.clear_all(&admin).unwrap(), 1);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle() {
        let (_, service) = setup();
        service.start_sweeper();
        service.start_sweeper();
        assert!(service.sweeper_running());

        service.shutdown();
        assert!(!service.sweeper_running());
        assert!(service.cache().is_closed());
    }
}
