//! Availability records, date windows and cache keys

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AvailabilityError, AvailabilityResult};
use crate::identity::{PropertyId, Timestamp};

/// Half-open calendar range `[start_date, end_date)`.
///
/// Dates carry no time zone; all callers agree on the platform's canonical
/// zone before building a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "RawWindow")]
pub struct AvailabilityWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Deserialize)]
struct RawWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawWindow> for AvailabilityWindow {
    type Error = AvailabilityError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start_date, raw.end_date)
    }
}

impl AvailabilityWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> AvailabilityResult<Self> {
        if start_date >= end_date {
            return Err(AvailabilityError::invalid(
                "window",
                format!("start_date {} must be before end_date {}", start_date, end_date),
            ));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Build a window from optional query parameters.
    ///
    /// Both bounds or neither must be present.
    pub fn from_bounds(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AvailabilityResult<Option<Self>> {
        match (start_date, end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            (Some(_), None) => Err(AvailabilityError::invalid(
                "end_date",
                "required when start_date is given",
            )),
            (None, Some(_)) => Err(AvailabilityError::invalid(
                "start_date",
                "required when end_date is given",
            )),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Number of nights covered by the window.
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.end_date
    }

    pub fn overlaps(&self, other: &AvailabilityWindow) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_date, self.end_date)
    }
}

/// Cache and store key: a property, optionally narrowed to a date window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityKey {
    pub property_id: PropertyId,
    pub window: Option<AvailabilityWindow>,
}

impl AvailabilityKey {
    pub fn new(property_id: PropertyId, window: Option<AvailabilityWindow>) -> Self {
        Self {
            property_id,
            window,
        }
    }

    /// Key for the property-wide (windowless) record.
    pub fn property(property_id: PropertyId) -> Self {
        Self::new(property_id, None)
    }
}

impl fmt::Display for AvailabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "{}@{}", self.property_id, window),
            None => write!(f, "{}", self.property_id),
        }
    }
}

/// Current availability of a property, as owned by the durable store.
///
/// `available_rooms <= total_rooms` always holds; the constructor rejects
/// anything else. `version` increases on every persisted update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AvailabilityRecord {
    pub property_id: PropertyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<AvailabilityWindow>,
    pub total_rooms: u32,
    pub available_rooms: u32,
    pub version: u64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub as_of: Timestamp,
}

impl AvailabilityRecord {
    pub fn new(
        property_id: PropertyId,
        total_rooms: u32,
        available_rooms: u32,
        version: u64,
    ) -> AvailabilityResult<Self> {
        validate_room_counts(total_rooms, available_rooms)?;
        Ok(Self {
            property_id,
            window: None,
            total_rooms,
            available_rooms,
            version,
            as_of: Utc::now(),
        })
    }

    pub fn with_window(mut self, window: Option<AvailabilityWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn with_as_of(mut self, as_of: Timestamp) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn key(&self) -> AvailabilityKey {
        AvailabilityKey::new(self.property_id.clone(), self.window)
    }

    /// Whether at least one room can still be booked.
    pub fn is_available(&self) -> bool {
        self.available_rooms > 0
    }

    pub fn occupied_rooms(&self) -> u32 {
        self.total_rooms.saturating_sub(self.available_rooms)
    }

    /// Re-check the room invariant (records may arrive deserialized).
    pub fn validate(&self) -> AvailabilityResult<()> {
        validate_room_counts(self.total_rooms, self.available_rooms)
    }
}

/// Requested change to a property's availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AvailabilityUpdate {
    pub available_rooms: u32,
    /// New room total; the stored total is kept when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rooms: Option<u32>,
}

impl AvailabilityUpdate {
    pub fn rooms(available_rooms: u32) -> Self {
        Self {
            available_rooms,
            total_rooms: None,
        }
    }

    pub fn with_total(mut self, total_rooms: u32) -> Self {
        self.total_rooms = Some(total_rooms);
        self
    }

    /// Apply on top of the current record, producing the record to persist.
    ///
    /// The version is left untouched; the store assigns the next one.
    pub fn apply_to(&self, current: &AvailabilityRecord) -> AvailabilityResult<AvailabilityRecord> {
        let total_rooms = self.total_rooms.unwrap_or(current.total_rooms);
        validate_room_counts(total_rooms, self.available_rooms)?;
        Ok(AvailabilityRecord {
            property_id: current.property_id.clone(),
            window: current.window,
            total_rooms,
            available_rooms: self.available_rooms,
            version: current.version,
            as_of: Utc::now(),
        })
    }
}

fn validate_room_counts(total_rooms: u32, available_rooms: u32) -> AvailabilityResult<()> {
    if available_rooms > total_rooms {
        return Err(AvailabilityError::invalid(
            "available_rooms",
            format!(
                "{} exceeds total_rooms {}",
                available_rooms, total_rooms
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pid(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap()
    }

    #[test]
    fn test_window_requires_start_before_end() {
        assert!(AvailabilityWindow::new(date(2026, 3, 1), date(2026, 3, 4)).is_ok());
        let err = AvailabilityWindow::new(date(2026, 3, 4), date(2026, 3, 4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(AvailabilityWindow::new(date(2026, 3, 5), date(2026, 3, 4)).is_err());
    }

    #[test]
    fn test_window_is_half_open() {
        let window = AvailabilityWindow::new(date(2026, 3, 1), date(2026, 3, 4)).unwrap();
        assert_eq!(window.nights(), 3);
        assert!(window.contains(date(2026, 3, 1)));
        assert!(window.contains(date(2026, 3, 3)));
        assert!(!window.contains(date(2026, 3, 4)));

        let next = AvailabilityWindow::new(date(2026, 3, 4), date(2026, 3, 6)).unwrap();
        assert!(!window.overlaps(&next));
        let straddling = AvailabilityWindow::new(date(2026, 3, 3), date(2026, 3, 6)).unwrap();
        assert!(window.overlaps(&straddling));
    }

    #[test]
    fn test_window_from_bounds_needs_both() {
        assert_eq!(AvailabilityWindow::from_bounds(None, None).unwrap(), None);
        assert!(AvailabilityWindow::from_bounds(Some(date(2026, 1, 1)), None).is_err());
        assert!(AvailabilityWindow::from_bounds(None, Some(date(2026, 1, 1))).is_err());
        assert!(
            AvailabilityWindow::from_bounds(Some(date(2026, 1, 1)), Some(date(2026, 1, 2)))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_window_deserialization_validates() {
        let ok: AvailabilityWindow =
            serde_json::from_str(r#"{"start_date":"2026-05-01","end_date":"2026-05-03"}"#)
                .unwrap();
        assert_eq!(ok.nights(), 2);

        let bad = serde_json::from_str::<AvailabilityWindow>(
            r#"{"start_date":"2026-05-03","end_date":"2026-05-01"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_record_rejects_overbooking() {
        assert!(AvailabilityRecord::new(pid("P1"), 10, 4, 1).is_ok());
        assert!(AvailabilityRecord::new(pid("P1"), 10, 10, 1).is_ok());
        assert!(AvailabilityRecord::new(pid("P1"), 0, 0, 1).is_ok());
        let err = AvailabilityRecord::new(pid("P1"), 10, 11, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_record_availability_helpers() {
        let record = AvailabilityRecord::new(pid("P1"), 10, 4, 1).unwrap();
        assert!(record.is_available());
        assert_eq!(record.occupied_rooms(), 6);

        let full = AvailabilityRecord::new(pid("P2"), 5, 0, 1).unwrap();
        assert!(!full.is_available());
    }

    #[test]
    fn test_update_keeps_total_when_absent() {
        let current = AvailabilityRecord::new(pid("P1"), 10, 4, 3).unwrap();

        let next = AvailabilityUpdate::rooms(2).apply_to(&current).unwrap();
        assert_eq!(next.total_rooms, 10);
        assert_eq!(next.available_rooms, 2);
        assert_eq!(next.version, 3);

        assert!(AvailabilityUpdate::rooms(12).apply_to(&current).is_err());

        let grown = AvailabilityUpdate::rooms(12).with_total(12).apply_to(&current).unwrap();
        assert_eq!(grown.total_rooms, 12);
    }

    #[test]
    fn test_key_display() {
        let window = AvailabilityWindow::new(date(2026, 3, 1), date(2026, 3, 4)).unwrap();
        assert_eq!(AvailabilityKey::property(pid("P1")).to_string(), "P1");
        assert_eq!(
            AvailabilityKey::new(pid("P1"), Some(window)).to_string(),
            "P1@[2026-03-01, 2026-03-04)"
        );
    }
}
