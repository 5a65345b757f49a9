//! Batch query results

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityRecord;
use crate::error::ErrorKind;
use crate::identity::PropertyId;

/// Overall outcome of a batch query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every requested property resolved to a record.
    Complete,
    /// At least one item failed; the rest are still valid.
    PartialFailure,
}

/// Result for one requested property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub property_id: PropertyId,
    pub outcome: Result<AvailabilityRecord, ErrorKind>,
}

impl BatchItem {
    pub fn found(property_id: PropertyId, record: AvailabilityRecord) -> Self {
        Self {
            property_id,
            outcome: Ok(record),
        }
    }

    pub fn failed(property_id: PropertyId, kind: ErrorKind) -> Self {
        Self {
            property_id,
            outcome: Err(kind),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn record(&self) -> Option<&AvailabilityRecord> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.outcome.as_ref().err().copied()
    }
}

/// Ordered batch of per-property outcomes.
///
/// Items follow the first-occurrence order of the request; every distinct
/// requested id appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    items: Vec<BatchItem>,
}

impl BatchResult {
    pub fn new(items: Vec<BatchItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<BatchItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, property_id: &PropertyId) -> Option<&BatchItem> {
        self.items.iter().find(|item| &item.property_id == property_id)
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn status(&self) -> BatchStatus {
        if self.failed() == 0 {
            BatchStatus::Complete
        } else {
            BatchStatus::PartialFailure
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &AvailabilityRecord> {
        self.items.iter().filter_map(BatchItem::record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap()
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let result = BatchResult::default();
        assert!(result.is_empty());
        assert_eq!(result.status(), BatchStatus::Complete);
    }

    #[test]
    fn test_status_reflects_item_failures() {
        let record = AvailabilityRecord::new(pid("P1"), 10, 4, 1).unwrap();
        let result = BatchResult::new(vec![
            BatchItem::found(pid("P1"), record.clone()),
            BatchItem::failed(pid("P2"), ErrorKind::NotFound),
        ]);

        assert_eq!(result.status(), BatchStatus::PartialFailure);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.get(&pid("P1")).and_then(BatchItem::record), Some(&record));
        assert_eq!(
            result.get(&pid("P2")).and_then(BatchItem::error),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(result.records().count(), 1);
    }

    #[test]
    fn test_batch_status_serialization() {
        let json = serde_json::to_string(&BatchStatus::PartialFailure).unwrap();
        assert_eq!(json, "\"partial_failure\"");
    }
}
