//! Engine configuration types

use crate::selector::SelectionStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatch engine configuration
///
/// Validated once at engine construction; invalid values fail fast with a
/// [`DispatchError::Config`](crate::error::DispatchError::Config). The
/// configuration is immutable after the engine is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Number of priority levels (higher level = more urgent)
    pub levels: usize,
    /// Base partition count; level `n` gets `base_partitions * (n + 1)` partitions
    pub base_partitions: usize,
    /// Per-level partition capacity, indexed by level
    pub capacities: Vec<usize>,
    /// Per-level batch size, indexed by level
    pub batch_sizes: Vec<usize>,
    /// Timeout for the last-resort blocking write
    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,
    /// Allow saturated levels to spill into lower-priority groups
    pub cross_priority_fallback: bool,
    /// Partition selection strategy
    pub selection: SelectionStrategy,
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(3, num_cpus::get().max(1))
    }
}

impl EngineConfig {
    /// Create a configuration with per-level defaults filled in
    ///
    /// Capacities default to 1024 per level. Batch sizes default to 64 for
    /// level 0, halved at each higher level (minimum 1), so urgent traffic is
    /// flushed in smaller batches.
    pub fn new(levels: usize, base_partitions: usize) -> Self {
        Self {
            levels,
            base_partitions,
            capacities: vec![1024; levels],
            batch_sizes: (0..levels).map(|l| (64usize >> l).max(1)).collect(),
            write_timeout: Duration::from_millis(150),
            cross_priority_fallback: true,
            selection: SelectionStrategy::RoundRobin,
        }
    }

    /// Set per-level capacities (builder pattern)
    pub fn with_capacities(mut self, capacities: Vec<usize>) -> Self {
        self.capacities = capacities;
        self
    }

    /// Set one capacity for every level (builder pattern)
    pub fn with_uniform_capacity(mut self, capacity: usize) -> Self {
        self.capacities = vec![capacity; self.levels];
        self
    }

    /// Set per-level batch sizes (builder pattern)
    pub fn with_batch_sizes(mut self, batch_sizes: Vec<usize>) -> Self {
        self.batch_sizes = batch_sizes;
        self
    }

    /// Set the last-resort write timeout (builder pattern)
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable or disable cross-priority fallback (builder pattern)
    pub fn with_cross_priority_fallback(mut self, enabled: bool) -> Self {
        self.cross_priority_fallback = enabled;
        self
    }

    /// Set the partition selection strategy (builder pattern)
    pub fn with_selection(mut self, selection: SelectionStrategy) -> Self {
        self.selection = selection;
        self
    }

    /// Validate the configuration
    ///
    /// Called by the engine constructor; exposed for callers that build
    /// configurations from external sources.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::DispatchError;

        if self.levels == 0 {
            return Err(DispatchError::Config("levels must be >= 1".to_string()));
        }
        if self.base_partitions == 0 {
            return Err(DispatchError::Config(
                "base_partitions must be >= 1".to_string(),
            ));
        }
        if self.capacities.len() != self.levels {
            return Err(DispatchError::Config(format!(
                "capacities has {} entries, expected {}",
                self.capacities.len(),
                self.levels
            )));
        }
        if self.batch_sizes.len() != self.levels {
            return Err(DispatchError::Config(format!(
                "batch_sizes has {} entries, expected {}",
                self.batch_sizes.len(),
                self.levels
            )));
        }
        if let Some(level) = self.capacities.iter().position(|&c| c == 0) {
            return Err(DispatchError::Config(format!(
                "capacity for level {} must be >= 1",
                level
            )));
        }
        if let Some(level) = self.batch_sizes.iter().position(|&b| b == 0) {
            return Err(DispatchError::Config(format!(
                "batch size for level {} must be >= 1",
                level
            )));
        }
        if self.write_timeout.is_zero() {
            return Err(DispatchError::Config(
                "write_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Partition count for a level: `base_partitions * (level + 1)`
    pub fn partitions_for_level(&self, level: usize) -> usize {
        self.base_partitions * (level + 1)
    }

    /// Total partition count across all levels
    pub fn total_partitions(&self) -> usize {
        (0..self.levels).map(|l| self.partitions_for_level(l)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.levels, 3);
        assert!(config.base_partitions >= 1);
        assert_eq!(config.capacities, vec![1024, 1024, 1024]);
        assert_eq!(config.batch_sizes, vec![64, 32, 16]);
        assert!(config.cross_priority_fallback);
        assert_eq!(config.selection, SelectionStrategy::RoundRobin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_new() {
        let config = EngineConfig::new(2, 4);
        assert_eq!(config.levels, 2);
        assert_eq!(config.base_partitions, 4);
        assert_eq!(config.batch_sizes, vec![64, 32]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_floor() {
        // 64 halves out after 7 levels; remaining levels floor at 1
        let config = EngineConfig::new(9, 1);
        assert_eq!(config.batch_sizes[6], 1);
        assert_eq!(config.batch_sizes[7], 1);
        assert_eq!(config.batch_sizes[8], 1);
    }

    #[test]
    fn test_builder_methods() {
        let config = EngineConfig::new(2, 2)
            .with_capacities(vec![100, 10])
            .with_batch_sizes(vec![8, 4])
            .with_write_timeout(Duration::from_millis(200))
            .with_cross_priority_fallback(false)
            .with_selection(SelectionStrategy::LeastLoaded);

        assert_eq!(config.capacities, vec![100, 10]);
        assert_eq!(config.batch_sizes, vec![8, 4]);
        assert_eq!(config.write_timeout, Duration::from_millis(200));
        assert!(!config.cross_priority_fallback);
        assert_eq!(config.selection, SelectionStrategy::LeastLoaded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_uniform_capacity() {
        let config = EngineConfig::new(3, 1).with_uniform_capacity(10);
        assert_eq!(config.capacities, vec![10, 10, 10]);
    }

    #[test]
    fn test_validate_zero_levels() {
        let mut config = EngineConfig::new(1, 1);
        config.levels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_base_partitions() {
        let mut config = EngineConfig::new(1, 1);
        config.base_partitions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_capacity_arity() {
        let config = EngineConfig::new(3, 1).with_capacities(vec![10, 10]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("capacities"));
    }

    #[test]
    fn test_validate_zero_capacity() {
        let config = EngineConfig::new(2, 1).with_capacities(vec![10, 0]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("level 1"));
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let config = EngineConfig::new(2, 1).with_batch_sizes(vec![0, 4]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = EngineConfig::new(1, 1).with_write_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partitions_for_level() {
        let config = EngineConfig::new(3, 2);
        assert_eq!(config.partitions_for_level(0), 2);
        assert_eq!(config.partitions_for_level(1), 4);
        assert_eq!(config.partitions_for_level(2), 6);
        assert_eq!(config.total_partitions(), 12);
    }

    #[test]
    fn test_engine_config_serialization() {
        let config = EngineConfig::new(2, 2).with_write_timeout(Duration::from_millis(250));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"write_timeout\":250"));

        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
