//! Availability request and response types

use chrono::NaiveDate;
use kost_core::{AvailabilityRecord, AvailabilityUpdate, AvailabilityWindow, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Optional stay window, given either as query parameters or body fields.
///
/// Both bounds or neither must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct WindowQuery {
    /// First night of the stay (inclusive)
    pub start_date: Option<NaiveDate>,
    /// Check-out day (exclusive)
    pub end_date: Option<NaiveDate>,
}

impl WindowQuery {
    /// Both bounds or neither; a lone bound reports the missing one.
    pub fn into_window(self) -> ApiResult<Option<AvailabilityWindow>> {
        match (self.start_date, self.end_date) {
            (Some(_), None) => Err(ApiError::missing_field("end_date")),
            (None, Some(_)) => Err(ApiError::missing_field("start_date")),
            (start_date, end_date) => Ok(AvailabilityWindow::from_bounds(start_date, end_date)?),
        }
    }
}

/// Room availability of one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AvailabilityResponse {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub total_rooms: u32,
    pub available_rooms: u32,
    pub occupied_rooms: u32,
    pub is_available: bool,
    /// Store version; increases with every accepted write
    pub version: u64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub as_of: Timestamp,
}

impl From<AvailabilityRecord> for AvailabilityResponse {
    fn from(record: AvailabilityRecord) -> Self {
        Self {
            start_date: record.window.map(|w| w.start_date()),
            end_date: record.window.map(|w| w.end_date()),
            occupied_rooms: record.occupied_rooms(),
            is_available: record.is_available(),
            property_id: record.property_id.into_inner(),
            total_rooms: record.total_rooms,
            available_rooms: record.available_rooms,
            version: record.version,
            as_of: record.as_of,
        }
    }
}

/// Request to change the room counts of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateAvailabilityRequest {
    pub available_rooms: u32,
    /// New room total; the current total is kept when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rooms: Option<u32>,
}

impl From<UpdateAvailabilityRequest> for AvailabilityUpdate {
    fn from(req: UpdateAvailabilityRequest) -> Self {
        let update = AvailabilityUpdate::rooms(req.available_rooms);
        match req.total_rooms {
            Some(total) => update.with_total(total),
            None => update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use kost_core::{ErrorKind, PropertyId};

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn test_window_query_requires_both_bounds() {
        assert_eq!(WindowQuery::default().into_window().unwrap(), None);

        let half = WindowQuery {
            start_date: Some(date("2026-07-01")),
            end_date: None,
        };
        assert_eq!(half.into_window().unwrap_err().code, ErrorCode::MissingField);
        let half = WindowQuery {
            start_date: None,
            end_date: Some(date("2026-07-01")),
        };
        let err = half.into_window().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("start_date"));

        let full = WindowQuery {
            start_date: Some(date("2026-07-01")),
            end_date: Some(date("2026-07-04")),
        };
        assert_eq!(full.into_window().unwrap().map(|w| w.nights()), Some(3));
    }

    #[test]
    fn test_response_from_record() {
        let window = AvailabilityWindow::new(date("2026-07-01"), date("2026-07-04")).unwrap();
        let record = AvailabilityRecord::new(PropertyId::new("P1").unwrap(), 10, 4, 3)
            .unwrap()
            .with_window(Some(window));
        let response = AvailabilityResponse::from(record);

        assert_eq!(response.property_id, "P1");
        assert_eq!(response.occupied_rooms, 6);
        assert!(response.is_available);
        assert_eq!(response.start_date, Some(date("2026-07-01")));
        assert_eq!(response.version, 3);
    }

    #[test]
    fn test_update_request_conversion() {
        let req: UpdateAvailabilityRequest =
            serde_json::from_str(r#"{"available_rooms": 2}"#).unwrap();
        let current = AvailabilityRecord::new(PropertyId::new("P1").unwrap(), 10, 4, 1).unwrap();
        let next = AvailabilityUpdate::from(req).apply_to(&current).unwrap();
        assert_eq!((next.total_rooms, next.available_rooms), (10, 2));

        let req = UpdateAvailabilityRequest {
            available_rooms: 12,
            total_rooms: None,
        };
        let err = AvailabilityUpdate::from(req).apply_to(&current).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
