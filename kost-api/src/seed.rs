//! Startup seeding of the in-memory property store.
//!
//! The seed file is a JSON array:
//!
//! ```json
//! [
//!   { "property_id": "P1", "total_rooms": 10, "available_rooms": 4 },
//!   { "property_id": "P2", "total_rooms": 5, "available_rooms": 3, "version": 7,
//!     "as_of": "2026-06-01T12:00:00Z" }
//! ]
//! ```

use std::path::Path;

use serde::Deserialize;

use kost_core::{AvailabilityRecord, PropertyId, Timestamp};
use kost_storage::InMemoryPropertyRepository;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedRecord {
    property_id: String,
    total_rooms: u32,
    available_rooms: u32,
    #[serde(default = "initial_version")]
    version: u64,
    /// Load time when absent.
    #[serde(default)]
    as_of: Option<Timestamp>,
}

fn initial_version() -> u64 {
    1
}

/// Parse seed JSON into validated records.
pub fn parse_seed(raw: &str) -> ApiResult<Vec<AvailabilityRecord>> {
    let entries: Vec<SeedRecord> = serde_json::from_str(raw)?;
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let property_id = PropertyId::new(entry.property_id)
                .map_err(|e| ApiError::invalid_input(format!("seed entry #{}: {}", index + 1, e)))?;
            let record =
                AvailabilityRecord::new(property_id, entry.total_rooms, entry.available_rooms, entry.version)
                    .map_err(|e| ApiError::invalid_input(format!("seed entry #{}: {}", index + 1, e)))?;
            Ok(match entry.as_of {
                Some(as_of) => record.with_as_of(as_of),
                None => record,
            })
        })
        .collect()
}

/// Load a seed file into the repository and return how many properties it held.
pub async fn load_seed_file(path: &Path, repository: &InMemoryPropertyRepository) -> ApiResult<usize> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        ApiError::internal_error(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;
    let records = parse_seed(&raw)?;
    let count = records.len();
    for record in records {
        repository.insert(record);
    }
    tracing::info!(path = %path.display(), properties = count, "Seeded property store");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_defaults_version_and_reads_as_of() {
        let records = parse_seed(
            r#"[{"property_id":"P1","total_rooms":10,"available_rooms":4},
                {"property_id":"P2","total_rooms":5,"available_rooms":3,"version":7,
                 "as_of":"2026-06-01T12:00:00Z"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].version, 1);
        assert_eq!(records[1].version, 7);
        assert_eq!(records[1].as_of.to_rfc3339(), "2026-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_seed_rejects_overbooked_entry() {
        let err = parse_seed(r#"[{"property_id":"P1","total_rooms":2,"available_rooms":3}]"#).unwrap_err();
        assert!(err.message.contains("seed entry #1"));
    }

    #[test]
    fn test_parse_seed_rejects_malformed_json() {
        assert!(parse_seed("{not json").is_err());
        assert!(parse_seed(r#"[{"property_id":"P1","total":2}]"#).is_err());
    }

    #[tokio::test]
    async fn test_load_seed_file_missing_path() {
        let repo = InMemoryPropertyRepository::new();
        let err = load_seed_file(Path::new("/nonexistent/kost-seed.json"), &repo)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InternalError);
        assert!(repo.is_empty());
    }
}
