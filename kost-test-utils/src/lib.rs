//! Kost Test Utilities
//!
//! Shared test infrastructure for the kost workspace:
//! - Proptest generators for availability types
//! - Seeded repositories for common scenarios
//! - Assertions for availability-specific checks

pub use kost_core::{
    AvailabilityError, AvailabilityKey, AvailabilityRecord, AvailabilityResult, AvailabilityUpdate,
    AvailabilityWindow, BatchResult, BatchStatus, CacheConfig, ErrorKind, PropertyId, Requester,
    Role, ServiceConfig, StatSnapshot,
};
pub use kost_storage::{InMemoryPropertyRepository, ManualClock};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating availability types.

    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    /// Generate a property id from a small pool so collisions happen.
    pub fn arb_property_id() -> impl Strategy<Value = PropertyId> {
        (0u16..64).prop_map(|n| fixtures::property_id(&format!("P{}", n)))
    }

    /// Generate a list of property ids that may contain duplicates.
    pub fn arb_property_ids(max_len: usize) -> impl Strategy<Value = Vec<PropertyId>> {
        proptest::collection::vec(arb_property_id(), 0..=max_len)
    }

    /// Generate a room count pair with `available <= total`.
    pub fn arb_room_counts() -> impl Strategy<Value = (u32, u32)> {
        (0u32..500).prop_flat_map(|total| (Just(total), 0..=total))
    }

    /// Generate a valid record for the given id.
    pub fn arb_record_for(property_id: PropertyId) -> impl Strategy<Value = AvailabilityRecord> {
        (arb_room_counts(), 1u64..1_000).prop_map(move |((total, available), version)| {
            fixtures::record_with_version(property_id.clone(), total, available, version)
        })
    }

    /// Generate a valid record.
    pub fn arb_record() -> impl Strategy<Value = AvailabilityRecord> {
        arb_property_id().prop_flat_map(arb_record_for)
    }

    /// Generate a stay window of 1 to 30 nights within 2024-2033.
    pub fn arb_window() -> impl Strategy<Value = AvailabilityWindow> {
        (arb_date(), 1i64..=30)
            .prop_map(|(start, nights)| fixtures::window(start, start + Duration::days(nights)))
    }

    /// Generate an update that may or may not be valid for a given record.
    pub fn arb_update() -> impl Strategy<Value = AvailabilityUpdate> {
        (0u32..600, proptest::option::of(0u32..600)).prop_map(|(available_rooms, total_rooms)| {
            AvailabilityUpdate {
                available_rooms,
                total_rooms,
            }
        })
    }

    /// Generate a date in the supported range.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3650).prop_map(|offset| fixtures::date(2024, 1, 1) + Duration::days(offset))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::NaiveDate;

    /// Build a property id, panicking on blank input.
    pub fn property_id(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap_or_else(|e| panic!("invalid fixture id {:?}: {}", raw, e))
    }

    pub fn record(property_id: PropertyId, total_rooms: u32, available_rooms: u32) -> AvailabilityRecord {
        record_with_version(property_id, total_rooms, available_rooms, 1)
    }

    pub fn record_with_version(
        property_id: PropertyId,
        total_rooms: u32,
        available_rooms: u32,
        version: u64,
    ) -> AvailabilityRecord {
        AvailabilityRecord::new(property_id, total_rooms, available_rooms, version)
            .unwrap_or_else(|e| panic!("invalid fixture record: {}", e))
    }

    /// A record breaking `available_rooms <= total_rooms`, as a faulty store
    /// might return it. Only constructible by struct update.
    pub fn overbooked_record(property_id: PropertyId, total_rooms: u32, available_rooms: u32) -> AvailabilityRecord {
        AvailabilityRecord {
            available_rooms,
            ..record(property_id, total_rooms, 0)
        }
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{}", year, month, day))
    }

    pub fn window(start_date: NaiveDate, end_date: NaiveDate) -> AvailabilityWindow {
        AvailabilityWindow::new(start_date, end_date)
            .unwrap_or_else(|e| panic!("invalid fixture window: {}", e))
    }

    /// Repository holding `(id, total_rooms, available_rooms)` rows at version 1.
    pub fn seeded_repository(rows: &[(&str, u32, u32)]) -> InMemoryPropertyRepository {
        let repository = InMemoryPropertyRepository::new();
        for (id, total, available) in rows {
            repository.insert(record(property_id(id), *total, *available));
        }
        repository
    }

    /// The two-property portfolio used across scenarios:
    /// P1 has 10 rooms with 4 free, P2 has 5 rooms with 3 free.
    pub fn two_property_repository() -> InMemoryPropertyRepository {
        seeded_repository(&[("P1", 10, 4), ("P2", 5, 3)])
    }

    pub fn owner() -> Requester {
        Requester::authenticated("owner-1", Role::Owner)
    }

    pub fn admin() -> Requester {
        Requester::authenticated("admin-1", Role::Admin)
    }

    pub fn viewer() -> Requester {
        Requester::authenticated("viewer-1", Role::Viewer)
    }

    /// Small cache that makes eviction easy to trigger.
    pub fn small_cache_config(capacity: usize) -> CacheConfig {
        CacheConfig::default().with_capacity(capacity).with_shard_count(1)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for availability-specific validation.

    use super::*;

    /// Assert that a result failed with the given kind.
    #[track_caller]
    pub fn assert_error_kind<T: std::fmt::Debug>(result: &AvailabilityResult<T>, kind: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind(), kind, "wrong error kind: {}", err),
            Ok(value) => panic!("Expected {:?} error, got Ok: {:?}", kind, value),
        }
    }

    /// Assert that a record obeys the room invariant.
    #[track_caller]
    pub fn assert_record_consistent(record: &AvailabilityRecord) {
        assert!(
            record.available_rooms <= record.total_rooms,
            "record {} has {} available of {} total",
            record.property_id,
            record.available_rooms,
            record.total_rooms
        );
    }

    /// Assert the room counts of a record.
    #[track_caller]
    pub fn assert_rooms(record: &AvailabilityRecord, total_rooms: u32, available_rooms: u32) {
        assert_eq!(
            (record.total_rooms, record.available_rooms),
            (total_rooms, available_rooms),
            "unexpected room counts for {}",
            record.property_id
        );
    }

    /// Assert that a batch item succeeded.
    #[track_caller]
    pub fn assert_item_found<'a>(batch: &'a BatchResult, property_id: &PropertyId) -> &'a AvailabilityRecord {
        match batch.get(property_id).map(|item| &item.outcome) {
            Some(Ok(record)) => record,
            Some(Err(kind)) => panic!("Expected {} to resolve, got {:?}", property_id, kind),
            None => panic!("{} missing from batch", property_id),
        }
    }

    /// Assert that a batch item failed with the given kind.
    #[track_caller]
    pub fn assert_item_failed(batch: &BatchResult, property_id: &PropertyId, kind: ErrorKind) {
        match batch.get(property_id).map(|item| &item.outcome) {
            Some(Err(actual)) => assert_eq!(*actual, kind, "wrong failure kind for {}", property_id),
            Some(Ok(record)) => panic!("Expected {} to fail, got {:?}", property_id, record),
            None => panic!("{} missing from batch", property_id),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_property_repository_fixture() {
        let repository = fixtures::two_property_repository();
        assert_eq!(repository.len(), 2);
        let p1 = repository.snapshot(&fixtures::property_id("P1")).unwrap();
        assertions::assert_rooms(&p1, 10, 4);
    }

    #[test]
    fn test_window_fixture_nights() {
        let window = fixtures::window(fixtures::date(2024, 3, 1), fixtures::date(2024, 3, 4));
        assert_eq!(window.nights(), 3);
    }

    proptest! {
        #[test]
        fn prop_generated_records_are_consistent(record in generators::arb_record()) {
            assertions::assert_record_consistent(&record);
        }

        #[test]
        fn prop_generated_windows_are_forward(window in generators::arb_window()) {
            prop_assert!(window.start_date() < window.end_date());
        }
    }
}
