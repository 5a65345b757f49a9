//! Aggregate availability statistics

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityRecord;
use crate::identity::Timestamp;

/// Point-in-time aggregate over every known property.
///
/// Properties whose record could not be resolved are left out of the room
/// totals and counted in `failed_properties` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatSnapshot {
    /// Ids returned by the store listing.
    pub total_properties: u64,
    /// Properties that contributed to the room totals.
    pub covered_properties: u64,
    pub failed_properties: u64,
    pub total_rooms: u64,
    pub available_rooms: u64,
    /// Properties with at least one free room.
    pub properties_with_vacancy: u64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub generated_at: Timestamp,
}

impl StatSnapshot {
    pub fn empty(generated_at: Timestamp) -> Self {
        Self {
            total_properties: 0,
            covered_properties: 0,
            failed_properties: 0,
            total_rooms: 0,
            available_rooms: 0,
            properties_with_vacancy: 0,
            generated_at,
        }
    }

    /// Fold resolved records into a snapshot.
    pub fn aggregate<'a>(
        records: impl IntoIterator<Item = &'a AvailabilityRecord>,
        total_properties: u64,
        generated_at: Timestamp,
    ) -> Self {
        let mut snapshot = Self::empty(generated_at);
        snapshot.total_properties = total_properties;
        for record in records {
            snapshot.covered_properties += 1;
            snapshot.total_rooms += u64::from(record.total_rooms);
            snapshot.available_rooms += u64::from(record.available_rooms);
            if record.is_available() {
                snapshot.properties_with_vacancy += 1;
            }
        }
        snapshot.failed_properties = total_properties.saturating_sub(snapshot.covered_properties);
        snapshot
    }

    /// Share of rooms still free, in `[0.0, 1.0]`.
    pub fn availability_rate(&self) -> f64 {
        if self.total_rooms == 0 {
            0.0
        } else {
            self.available_rooms as f64 / self.total_rooms as f64
        }
    }

    pub fn occupied_rooms(&self) -> u64 {
        self.total_rooms - self.available_rooms
    }
}
