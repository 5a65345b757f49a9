//! Batch lookup types

use std::collections::HashSet;

use chrono::NaiveDate;
use kost_core::{AvailabilityWindow, BatchResult, BatchStatus, PropertyId};
use serde::{Deserialize, Serialize};

use super::{AvailabilityResponse, WindowQuery};
use crate::error::{ApiError, ApiResult, ErrorCode};

/// Request for the availability of many properties at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BatchAvailabilityRequest {
    /// Property ids; duplicates are answered once
    pub property_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl BatchAvailabilityRequest {
    /// Validate ids and window, de-duplicating ids in request order.
    pub fn parse(self, max_batch_size: usize) -> ApiResult<(Vec<PropertyId>, Option<AvailabilityWindow>)> {
        let window = WindowQuery {
            start_date: self.start_date,
            end_date: self.end_date,
        }
        .into_window()?;

        let mut seen = HashSet::with_capacity(self.property_ids.len());
        let mut ids = Vec::with_capacity(self.property_ids.len());
        for (index, raw) in self.property_ids.into_iter().enumerate() {
            let id = PropertyId::new(raw).map_err(|_| {
                ApiError::invalid_input(format!("property_ids[{}] must not be blank", index))
            })?;
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        if ids.len() > max_batch_size {
            return Err(ApiError::batch_too_large(ids.len(), max_batch_size));
        }
        Ok((ids, window))
    }
}

/// Result for a single property of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "status")]
pub enum BatchItemResult<T> {
    /// Lookup succeeded
    #[serde(rename = "success")]
    Success { property_id: String, data: T },
    /// Lookup failed; other items are unaffected
    #[serde(rename = "error")]
    Error {
        property_id: String,
        message: String,
        code: ErrorCode,
    },
}

/// Response from a batch lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BatchAvailabilityResponse {
    /// `complete` when every item succeeded, `partial_failure` otherwise
    pub status: BatchStatus,
    /// One result per distinct requested id, in request order
    pub results: Vec<BatchItemResult<AvailabilityResponse>>,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<BatchResult> for BatchAvailabilityResponse {
    fn from(batch: BatchResult) -> Self {
        let status = batch.status();
        let succeeded = batch.succeeded();
        let failed = batch.failed();
        let results = batch
            .into_items()
            .into_iter()
            .map(|item| {
                let property_id = item.property_id.into_inner();
                match item.outcome {
                    Ok(record) => BatchItemResult::Success {
                        property_id,
                        data: record.into(),
                    },
                    Err(kind) => {
                        let code = ErrorCode::from(kind);
                        BatchItemResult::Error {
                            property_id,
                            message: code.default_message().to_string(),
                            code,
                        }
                    }
                }
            })
            .collect();
        Self {
            status,
            results,
            succeeded,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kost_core::{AvailabilityRecord, BatchItem, ErrorKind};

    fn request(ids: &[&str]) -> BatchAvailabilityRequest {
        BatchAvailabilityRequest {
            property_ids: ids.iter().map(|s| s.to_string()).collect(),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_parse_dedupes_in_order() {
        let (ids, window) = request(&["P2", "P1", "P2"]).parse(10).unwrap();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["P2", "P1"]);
        assert!(window.is_none());
    }

    #[test]
    fn test_parse_rejects_blank_and_oversized() {
        let err = request(&["P1", "  "]).parse(10).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("property_ids[1]"));

        let err = request(&["P1", "P2", "P3"]).parse(2).unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchTooLarge);
    }

    #[test]
    fn test_partial_failure_serialization() -> Result<(), serde_json::Error> {
        let p1 = PropertyId::new("P1").unwrap();
        let p2 = PropertyId::new("P2").unwrap();
        let batch = BatchResult::new(vec![
            BatchItem::found(p1.clone(), AvailabilityRecord::new(p1, 10, 4, 1).unwrap()),
            BatchItem::failed(p2, ErrorKind::Unavailable),
        ]);
        let response = BatchAvailabilityResponse::from(batch);
        assert_eq!(response.succeeded, 1);
        assert_eq!(response.failed, 1);

        let json = serde_json::to_value(&response)?;
        assert_eq!(json["status"], "partial_failure");
        assert_eq!(json["results"][0]["status"], "success");
        assert_eq!(json["results"][0]["data"]["available_rooms"], 4);
        assert_eq!(json["results"][1]["status"], "error");
        assert_eq!(json["results"][1]["code"], "SERVICE_UNAVAILABLE");
        Ok(())
    }
}
