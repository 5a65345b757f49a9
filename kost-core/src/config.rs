//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Availability cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheConfig {
    /// Maximum number of entries across all shards.
    pub capacity: usize,
    /// Lifetime of a cache entry.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub entry_ttl: Duration,
    /// Number of independently locked shards.
    pub shard_count: usize,
    /// Interval of the background expired-entry sweep.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            entry_ttl: Duration::from_secs(30),
            shard_count: 16,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Capacity of shard `index`.
    ///
    /// The remainder of `capacity / shard_count` goes to the lowest shards, so
    /// the capacities of all shards sum to exactly `capacity`. A valid config
    /// (`shard_count <= capacity`) gives every shard at least one entry.
    pub fn shard_capacity(&self, index: usize) -> usize {
        let shards = self.shard_count.max(1);
        let extra = usize::from(index < self.capacity % shards);
        (self.capacity / shards + extra).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(invalid("capacity", self.capacity, "capacity must be greater than 0"));
        }
        if self.shard_count == 0 {
            return Err(invalid(
                "shard_count",
                self.shard_count,
                "shard_count must be greater than 0",
            ));
        }
        if self.shard_count > self.capacity {
            return Err(invalid(
                "shard_count",
                self.shard_count,
                "shard_count must not exceed capacity",
            ));
        }
        if self.entry_ttl.is_zero() {
            return Err(invalid(
                "entry_ttl",
                format!("{:?}", self.entry_ttl),
                "entry_ttl must be positive",
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(invalid(
                "sweep_interval",
                format!("{:?}", self.sweep_interval),
                "sweep_interval must be positive",
            ));
        }
        Ok(())
    }
}

/// Service-level limits applied around the store and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServiceConfig {
    /// Upper bound on any single store call.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub store_timeout: Duration,
    /// Lifetime of the cached statistics snapshot.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub stats_ttl: Duration,
    /// Largest number of distinct ids accepted by one batch query.
    pub max_batch_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(2),
            stats_ttl: Duration::from_secs(10),
            max_batch_size: 500,
        }
    }
}

impl ServiceConfig {
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_stats_ttl(mut self, ttl: Duration) -> Self {
        self.stats_ttl = ttl;
        self
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_timeout.is_zero() {
            return Err(invalid(
                "store_timeout",
                format!("{:?}", self.store_timeout),
                "store_timeout must be positive",
            ));
        }
        if self.stats_ttl.is_zero() {
            return Err(invalid(
                "stats_ttl",
                format!("{:?}", self.stats_ttl),
                "stats_ttl must be positive",
            ));
        }
        if self.max_batch_size == 0 {
            return Err(invalid(
                "max_batch_size",
                self.max_batch_size,
                "max_batch_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cache_config_rejects_zero_values() {
        let err = CacheConfig::default().with_capacity(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "capacity"));

        assert!(CacheConfig::default().with_shard_count(0).validate().is_err());
        assert!(CacheConfig::default()
            .with_entry_ttl(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_capacity(4)
            .with_shard_count(8)
            .validate()
            .is_err());
    }

    #[test]
    fn test_shard_capacities_sum_to_capacity() {
        let config = CacheConfig::default().with_capacity(10).with_shard_count(4);
        let capacities: Vec<usize> = (0..4).map(|i| config.shard_capacity(i)).collect();
        assert_eq!(capacities, vec![3, 3, 2, 2]);

        for (capacity, shards) in [(1, 1), (7, 7), (100, 16), (1000, 3), (4096, 16)] {
            let config = CacheConfig::default()
                .with_capacity(capacity)
                .with_shard_count(shards);
            let total: usize = (0..shards).map(|i| config.shard_capacity(i)).sum();
            assert_eq!(total, capacity, "capacity {} over {} shards", capacity, shards);
            assert!((0..shards).all(|i| config.shard_capacity(i) >= 1));
        }
    }

    #[test]
    fn test_service_config_rejects_zero_values() {
        assert!(ServiceConfig::default()
            .with_store_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ServiceConfig::default().with_max_batch_size(0).validate().is_err());
        assert!(ServiceConfig::default()
            .with_stats_ttl(Duration::from_millis(1))
            .validate()
            .is_ok());
    }
}
