//! One independently locked slice of the cache with LRU eviction.

use std::collections::{BTreeMap, HashMap};

use kost_core::{AvailabilityKey, AvailabilityRecord, AvailabilityWindow, PropertyId, Timestamp};

use super::entry::CacheEntry;

pub(crate) enum Lookup {
    Hit(AvailabilityRecord),
    /// An entry existed but was expired or superseded and has been dropped.
    Stale,
    Miss,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    tick: u64,
}

/// Entries grouped by property so all windows of a property share a shard.
///
/// `recency` maps access ticks to keys; its first element is the least
/// recently used entry.
#[derive(Debug)]
pub(crate) struct Shard {
    entries: HashMap<PropertyId, HashMap<Option<AvailabilityWindow>, Slot>>,
    recency: BTreeMap<u64, AvailabilityKey>,
    next_tick: u64,
    len: usize,
    capacity: usize,
}

impl Shard {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            len: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    pub fn lookup(&mut self, key: &AvailabilityKey, now: Timestamp, known_version: u64) -> Lookup {
        let tick = self.tick();
        let Some(slot) = self
            .entries
            .get_mut(&key.property_id)
            .and_then(|windows| windows.get_mut(&key.window))
        else {
            return Lookup::Miss;
        };

        if !slot.entry.is_valid(now, known_version) {
            self.remove(key);
            return Lookup::Stale;
        }

        let previous = std::mem::replace(&mut slot.tick, tick);
        let record = slot.entry.value.clone();
        self.recency.remove(&previous);
        self.recency.insert(tick, key.clone());
        Lookup::Hit(record)
    }

    /// Insert or overwrite, returning the number of entries evicted.
    pub fn insert(&mut self, entry: CacheEntry) -> u64 {
        let tick = self.tick();
        let key = entry.key.clone();
        let replaced = self
            .entries
            .entry(key.property_id.clone())
            .or_default()
            .insert(key.window, Slot { entry, tick });

        match replaced {
            Some(old) => {
                self.recency.remove(&old.tick);
            }
            None => self.len += 1,
        }
        self.recency.insert(tick, key);

        let mut evicted = 0;
        while self.len > self.capacity {
            let Some((_, lru_key)) = self.recency.pop_first() else {
                break;
            };
            if self.take(&lru_key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &AvailabilityKey) -> bool {
        match self.take(key) {
            Some(slot) => {
                self.recency.remove(&slot.tick);
                true
            }
            None => false,
        }
    }

    /// Detach a slot without touching `recency`.
    fn take(&mut self, key: &AvailabilityKey) -> Option<Slot> {
        let windows = self.entries.get_mut(&key.property_id)?;
        let slot = windows.remove(&key.window)?;
        if windows.is_empty() {
            self.entries.remove(&key.property_id);
        }
        self.len -= 1;
        Some(slot)
    }

    /// Drop every window of a property.
    pub fn remove_property(&mut self, property_id: &PropertyId) -> usize {
        let Some(windows) = self.entries.remove(property_id) else {
            return 0;
        };
        for slot in windows.values() {
            self.recency.remove(&slot.tick);
        }
        self.len -= windows.len();
        windows.len()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.len;
        self.entries.clear();
        self.recency.clear();
        self.len = 0;
        removed
    }

    /// Drop every entry that is expired or superseded.
    pub fn purge(&mut self, now: Timestamp, known_version: impl Fn(&PropertyId) -> u64) -> usize {
        let stale: Vec<AvailabilityKey> = self
            .entries
            .iter()
            .flat_map(|(property_id, windows)| {
                let known = known_version(property_id);
                windows
                    .values()
                    .filter(move |slot| !slot.entry.is_valid(now, known))
                    .map(|slot| slot.entry.key.clone())
            })
            .collect();
        stale.iter().filter(|key| self.remove(key)).count()
    }
}
