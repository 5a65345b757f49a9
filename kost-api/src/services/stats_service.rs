//! Aggregate statistics with a short-lived snapshot.
//!
//! Only one recompute runs at a time. Writes bump a generation counter, and
//! a snapshot whose computation overlapped a write is returned to its caller
//! but never stored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use kost_core::{AvailabilityError, AvailabilityResult, StatSnapshot, Timestamp};

use super::availability_service::AvailabilityService;

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: StatSnapshot,
    computed_at: Timestamp,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCache {
    current: Mutex<Option<CachedSnapshot>>,
    generation: AtomicU64,
    recompute: tokio::sync::Mutex<()>,
}

impl StatsCache {
    /// Stored snapshot if it is younger than `ttl`.
    fn fresh(&self, now: Timestamp, ttl: Duration) -> Option<StatSnapshot> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = current.as_ref()?;
        let fresh = match (now - cached.computed_at).to_std() {
            Ok(age) => age < ttl,
            // Clock moved backwards.
            Err(_) => true,
        };
        fresh.then(|| cached.snapshot.clone())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store unless a write happened since `generation` was read.
    fn store(&self, snapshot: StatSnapshot, generation: u64, computed_at: Timestamp) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation() != generation {
            return false;
        }
        *current = Some(CachedSnapshot {
            snapshot,
            computed_at,
        });
        true
    }

    /// Forget the stored snapshot after a write.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AvailabilityService {
    /// Totals across every property known to the store.
    ///
    /// Properties that fail to resolve are excluded from the room totals and
    /// counted in `failed_properties`.
    #[tracing::instrument(skip_all)]
    pub async fn stats(&self) -> AvailabilityResult<StatSnapshot> {
        let ttl = self.config.stats_ttl;
        if let Some(snapshot) = self.stats.fresh(self.clock.now(), ttl) {
            return Ok(snapshot);
        }

        let _recompute = self.stats.recompute.lock().await;
        if let Some(snapshot) = self.stats.fresh(self.clock.now(), ttl) {
            return Ok(snapshot);
        }

        let generation = self.stats.generation();
        let mut ids = self.list_ids().await.map_err(|err| {
            tracing::warn!(error = %err, "Listing properties failed");
            AvailabilityError::unavailable(err.to_string())
        })?;
        ids.sort();
        ids.dedup();

        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.config.max_batch_size) {
            let batch = self.get_many(chunk, None).await?;
            records.extend(batch.into_items().into_iter().filter_map(|item| item.outcome.ok()));
        }

        let computed_at = self.clock.now();
        let snapshot = StatSnapshot::aggregate(records.iter(), ids.len() as u64, computed_at);
        let stored = self.stats.store(snapshot.clone(), generation, computed_at);
        tracing::debug!(
            total_properties = snapshot.total_properties,
            failed_properties = snapshot.failed_properties,
            stored,
            "Recomputed availability stats"
        );
        Ok(snapshot)
    }
}
