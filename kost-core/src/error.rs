//! Error types for availability operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::identity::PropertyId;

/// Failure category reported to callers.
///
/// `PartialFailure` is not a variant: a batch that lost some items is still a
/// successful batch and carries its failures per item (see
/// [`BatchStatus`](crate::BatchStatus)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    Unauthorized,
    Unavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Errors raised by the property store behind the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Property not found: {0}")]
    NotFound(PropertyId),

    #[error("Store rejected record for {property_id}: {reason}")]
    Rejected { property_id: PropertyId, reason: String },

    #[error("Store unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Store call '{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for availability operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("No availability record for property {property_id}")]
    NotFound { property_id: PropertyId },

    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Requester '{requester}' is not allowed to {action}")]
    Unauthorized { requester: String, action: String },

    #[error("Availability store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl AvailabilityError {
    pub fn not_found(property_id: PropertyId) -> Self {
        Self::NotFound { property_id }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Category of this error in the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }
}

impl From<StoreError> for AvailabilityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(property_id) => Self::NotFound { property_id },
            StoreError::Rejected { reason, .. } => Self::Validation {
                field: "available_rooms".to_string(),
                reason,
            },
            StoreError::Unreachable { .. } | StoreError::Timeout { .. } => Self::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for AvailabilityError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingRequired { field } => Self::Validation {
                field,
                reason: "required".to_string(),
            },
            ConfigError::InvalidValue { field, reason, .. } => Self::Validation { field, reason },
        }
    }
}

/// Result type alias for availability operations.
pub type AvailabilityResult<T> = Result<T, AvailabilityError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: &str) -> PropertyId {
        PropertyId::new(raw).unwrap()
    }

    #[test]
    fn test_store_error_maps_to_taxonomy() {
        assert_eq!(
            AvailabilityError::from(StoreError::NotFound(pid("P1"))).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AvailabilityError::from(StoreError::Unreachable {
                reason: "connection reset".to_string()
            })
            .kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            AvailabilityError::from(StoreError::Timeout {
                operation: "fetch_many".to_string(),
                after: Duration::from_millis(250),
            })
            .kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            AvailabilityError::from(StoreError::Rejected {
                property_id: pid("P1"),
                reason: "available_rooms exceeds total_rooms".to_string(),
            })
            .kind(),
            ErrorKind::ValidationError
        );
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = AvailabilityError::not_found(pid("kost-anggrek"));
        assert!(err.to_string().contains("kost-anggrek"));

        let err = StoreError::Timeout {
            operation: "fetch_one".to_string(),
            after: Duration::from_millis(100),
        };
        let msg = err.to_string();
        assert!(msg.contains("fetch_one"));
        assert!(msg.contains("100ms"));
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::ValidationError).unwrap();
        assert_eq!(json, "\"VALIDATION_ERROR\"");
        assert_eq!(ErrorKind::Unavailable.to_string(), "unavailable");
    }
}
