//! Request coalescing for concurrent loads of the same key.
//!
//! The first caller for a key becomes the leader and performs the load; later
//! callers subscribe to the leader's result. A flight can be abandoned (the
//! write path does this on invalidation), which closes the channel and sends
//! every subscriber back to loading on its own. A leader that is dropped
//! before completing abandons its flight the same way.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

#[derive(Debug)]
struct Flight<V> {
    id: u64,
    tx: broadcast::Sender<V>,
}

#[derive(Debug)]
pub struct SingleFlight<K, V>
where
    K: Eq + Hash,
{
    flights: DashMap<K, Flight<V>>,
    next_id: AtomicU64,
}

/// Position of a caller within a flight.
pub enum FlightRole<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    Leader(LeaderGuard<'a, K, V>),
    Follower(broadcast::Receiver<V>),
}

/// Held by the leader until it publishes a result.
pub struct LeaderGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    group: &'a SingleFlight<K, V>,
    key: Option<K>,
    id: u64,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            flights: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Lead a new flight for `key` or follow the one already in progress.
    pub fn join(&self, key: K) -> FlightRole<'_, K, V> {
        match self.flights.entry(key.clone()) {
            Entry::Occupied(flight) => FlightRole::Follower(flight.get().tx.subscribe()),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, _) = broadcast::channel(1);
                slot.insert(Flight { id, tx });
                FlightRole::Leader(LeaderGuard {
                    group: self,
                    key: Some(key),
                    id,
                })
            }
        }
    }

    /// Abandon every flight whose key matches. Returns how many were dropped.
    pub fn abandon_where(&self, mut matches: impl FnMut(&K) -> bool) -> usize {
        let mut abandoned = 0;
        self.flights.retain(|key, _| {
            if matches(key) {
                abandoned += 1;
                false
            } else {
                true
            }
        });
        abandoned
    }

    pub fn abandon_all(&self) {
        self.flights.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    fn finish(&self, key: &K, id: u64) -> Option<Flight<V>> {
        self.flights
            .remove_if(key, |_, flight| flight.id == id)
            .map(|(_, flight)| flight)
    }
}

impl<K, V> LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Publish the result to every follower.
    ///
    /// Returns the number of followers reached; zero when the flight was
    /// abandoned while the leader was loading.
    pub fn complete(mut self, value: V) -> usize {
        let Some(key) = self.key.take() else {
            return 0;
        };
        match self.group.finish(&key, self.id) {
            Some(flight) => flight.tx.send(value).unwrap_or(0),
            None => 0,
        }
    }
}

impl<K, V> Drop for LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.group.finish(&key, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_followers_receive_leader_result() {
        let group: SingleFlight<&str, u32> = SingleFlight::new();

        let FlightRole::Leader(leader) = group.join("P1") else {
            panic!("first caller must lead");
        };
        let FlightRole::Follower(mut rx) = group.join("P1") else {
            panic!("second caller must follow");
        };
        assert_eq!(group.in_flight(), 1);

        assert_eq!(leader.complete(7), 1);
        assert_eq!(rx.recv().await.unwrap(), 7);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_flight_closes_followers() {
        let group: SingleFlight<&str, u32> = SingleFlight::new();

        let FlightRole::Leader(leader) = group.join("P1") else {
            panic!("first caller must lead");
        };
        let FlightRole::Follower(mut rx) = group.join("P1") else {
            panic!("second caller must follow");
        };

        assert_eq!(group.abandon_where(|key| *key == "P1"), 1);
        assert!(rx.recv().await.is_err());

        // A fresh caller starts a new flight that the old leader cannot finish.
        let FlightRole::Leader(fresh) = group.join("P1") else {
            panic!("flight was abandoned, caller must lead");
        };
        assert_eq!(leader.complete(1), 0);
        assert_eq!(group.in_flight(), 1);
        drop(fresh);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_flight() {
        let group: SingleFlight<&str, u32> = SingleFlight::new();
        let role = group.join("P1");
        let FlightRole::Follower(mut rx) = group.join("P1") else {
            panic!("second caller must follow");
        };
        drop(role);

        assert!(rx.recv().await.is_err());
        assert!(matches!(group.join("P1"), FlightRole::Leader(_)));
    }
}
