//! Statistics and cache counter types

use kost_core::{StatSnapshot, Timestamp};
use kost_storage::CacheStats;
use serde::{Deserialize, Serialize};

/// Aggregate availability across all properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatsResponse {
    pub total_properties: u64,
    pub covered_properties: u64,
    /// Properties left out of the totals because they could not be resolved
    pub failed_properties: u64,
    pub total_rooms: u64,
    pub available_rooms: u64,
    pub occupied_rooms: u64,
    pub properties_with_vacancy: u64,
    /// available_rooms / total_rooms, 0 when there are no rooms
    pub availability_rate: f64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub generated_at: Timestamp,
}

impl From<StatSnapshot> for StatsResponse {
    fn from(snapshot: StatSnapshot) -> Self {
        Self {
            occupied_rooms: snapshot.occupied_rooms(),
            availability_rate: snapshot.availability_rate(),
            total_properties: snapshot.total_properties,
            covered_properties: snapshot.covered_properties,
            failed_properties: snapshot.failed_properties,
            total_rooms: snapshot.total_rooms,
            available_rooms: snapshot.available_rooms,
            properties_with_vacancy: snapshot.properties_with_vacancy,
            generated_at: snapshot.generated_at,
        }
    }
}

/// Cache counters reported by the readiness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStatsResponse {
    pub entries: u64,
    pub capacity: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub stale_drops: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub coalesced_loads: u64,
    pub rejected_puts: u64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            entries: stats.entry_count,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            stale_drops: stats.stale_drops,
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            coalesced_loads: stats.coalesced_loads,
            rejected_puts: stats.rejected_puts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kost_core::{AvailabilityRecord, PropertyId};

    #[test]
    fn test_stats_response_carries_rate() {
        let records = vec![
            AvailabilityRecord::new(PropertyId::new("P1").unwrap(), 10, 4, 1).unwrap(),
            AvailabilityRecord::new(PropertyId::new("P2").unwrap(), 5, 3, 1).unwrap(),
        ];
        let snapshot = StatSnapshot::aggregate(records.iter(), 2, Utc::now());
        let response = StatsResponse::from(snapshot);

        assert_eq!(response.total_rooms, 15);
        assert_eq!(response.available_rooms, 7);
        assert_eq!(response.occupied_rooms, 8);
        assert!((response.availability_rate - 7.0 / 15.0).abs() < 1e-9);
    }
}
