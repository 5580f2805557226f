//! Partition selection strategies
//!
//! This module decides which partition inside a priority group receives an
//! item. The strategy is chosen once per engine instance; the engine creates
//! one selector per group so round-robin cursors do not interleave across
//! levels.

use crate::stats::PartitionMetrics;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Selector trait for routing items to partitions within a group
///
/// `partitions` is the group's metrics view, one entry per partition; the
/// returned index must be in the range `[0, partitions.len())`. Selection runs
/// on the enqueue hot path and must not block or suspend.
pub trait Selector: Send + Sync {
    /// Pick a destination partition for an item
    fn select(&self, affinity_key: Option<&str>, partitions: &[Arc<PartitionMetrics>]) -> usize;
}

/// Round-robin selector - distributes items evenly across partitions
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RoundRobinSelector {
    fn select(&self, _affinity_key: Option<&str>, partitions: &[Arc<PartitionMetrics>]) -> usize {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        count % partitions.len()
    }
}

/// Affinity selector - routes same-key items to the same partition
///
/// `hash(key) mod partition_count` is deterministic, so all items sharing an
/// affinity key land in the same partition and keep their relative order (as
/// long as the partition accepts the write; fallback under saturation trades
/// that guarantee for forward progress). Items without a key fall back to a
/// round-robin cursor.
pub struct AffinitySelector {
    keyless: AtomicUsize,
}

impl AffinitySelector {
    pub fn new() -> Self {
        Self {
            keyless: AtomicUsize::new(0),
        }
    }

    fn hash_key(key: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for AffinitySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for AffinitySelector {
    fn select(&self, affinity_key: Option<&str>, partitions: &[Arc<PartitionMetrics>]) -> usize {
        match affinity_key {
            Some(key) => (Self::hash_key(key) as usize) % partitions.len(),
            None => self.keyless.fetch_add(1, Ordering::Relaxed) % partitions.len(),
        }
    }
}

/// Least-loaded selector - picks the partition with the smallest depth
///
/// Depth reads are relaxed atomics taken while other producers and the
/// consumers keep running, so the result is approximate. That is acceptable
/// for a load-balancing heuristic; nothing correctness-critical may depend on
/// it. Ties break toward the lowest index.
pub struct LeastLoadedSelector;

impl LeastLoadedSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastLoadedSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for LeastLoadedSelector {
    fn select(&self, _affinity_key: Option<&str>, partitions: &[Arc<PartitionMetrics>]) -> usize {
        let mut best = 0;
        let mut best_depth = usize::MAX;
        for (index, metrics) in partitions.iter().enumerate() {
            let depth = metrics.depth();
            if depth < best_depth {
                best = index;
                best_depth = depth;
            }
        }
        best
    }
}

/// Custom selector that uses a user-provided function
///
/// The function receives the affinity key (if any) and the partition count.
pub struct CustomSelector<F>
where
    F: Fn(Option<&str>, usize) -> usize + Send + Sync,
{
    func: F,
}

impl<F> CustomSelector<F>
where
    F: Fn(Option<&str>, usize) -> usize + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Selector for CustomSelector<F>
where
    F: Fn(Option<&str>, usize) -> usize + Send + Sync,
{
    fn select(&self, affinity_key: Option<&str>, partitions: &[Arc<PartitionMetrics>]) -> usize {
        (self.func)(affinity_key, partitions.len()) % partitions.len()
    }
}

/// Partition selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Hash-based distribution (same keys go to the same partition)
    Affinity,
    /// Round-robin distribution
    RoundRobin,
    /// Pick the partition with the smallest current depth
    LeastLoaded,
}

impl SelectionStrategy {
    /// Create a selector instance for one priority group
    pub fn create_selector(&self) -> Arc<dyn Selector> {
        match self {
            SelectionStrategy::Affinity => Arc::new(AffinitySelector::new()),
            SelectionStrategy::RoundRobin => Arc::new(RoundRobinSelector::new()),
            SelectionStrategy::LeastLoaded => Arc::new(LeastLoadedSelector::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_view(n: usize) -> Vec<Arc<PartitionMetrics>> {
        (0..n).map(|_| Arc::new(PartitionMetrics::new())).collect()
    }

    #[test]
    fn test_round_robin_selector() {
        let selector = RoundRobinSelector::new();
        let view = metrics_view(4);

        assert_eq!(selector.select(None, &view), 0);
        assert_eq!(selector.select(None, &view), 1);
        assert_eq!(selector.select(None, &view), 2);
        assert_eq!(selector.select(None, &view), 3);
        assert_eq!(selector.select(None, &view), 0); // Wraps around
    }

    #[test]
    fn test_affinity_selector_deterministic() {
        let selector = AffinitySelector::new();
        let view = metrics_view(4);

        // Same key always goes to the same partition
        let p1 = selector.select(Some("session-42"), &view);
        let p2 = selector.select(Some("session-42"), &view);
        assert_eq!(p1, p2);

        // Different keys are at least consistent
        let p3 = selector.select(Some("session-43"), &view);
        let p4 = selector.select(Some("session-43"), &view);
        assert_eq!(p3, p4);
    }

    #[test]
    fn test_affinity_selector_keyless_round_robins() {
        let selector = AffinitySelector::new();
        let view = metrics_view(3);

        assert_eq!(selector.select(None, &view), 0);
        assert_eq!(selector.select(None, &view), 1);
        assert_eq!(selector.select(None, &view), 2);
        assert_eq!(selector.select(None, &view), 0);
    }

    #[test]
    fn test_least_loaded_selector() {
        let selector = LeastLoadedSelector::new();
        let view = metrics_view(3);
        view[0].incr_depth();
        view[0].incr_depth();
        view[1].incr_depth();

        assert_eq!(selector.select(None, &view), 2);
    }

    #[test]
    fn test_least_loaded_tie_breaks_lowest_index() {
        let selector = LeastLoadedSelector::new();
        let view = metrics_view(4);
        view[0].incr_depth();

        // Partitions 1, 2, 3 are all empty; the lowest index wins
        assert_eq!(selector.select(None, &view), 1);
    }

    #[test]
    fn test_custom_selector() {
        let selector = CustomSelector::new(|key: Option<&str>, _n| {
            if key.map(|k| k.starts_with("hot")).unwrap_or(false) {
                0
            } else {
                1
            }
        });
        let view = metrics_view(4);

        assert_eq!(selector.select(Some("hot-path"), &view), 0);
        assert_eq!(selector.select(Some("cold-path"), &view), 1);
        assert_eq!(selector.select(None, &view), 1);
    }

    #[test]
    fn test_create_selector() {
        let view = metrics_view(2);
        for strategy in [
            SelectionStrategy::Affinity,
            SelectionStrategy::RoundRobin,
            SelectionStrategy::LeastLoaded,
        ] {
            let selector = strategy.create_selector();
            let index = selector.select(Some("k"), &view);
            assert!(index < 2);
        }
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&SelectionStrategy::LeastLoaded).unwrap();
        let parsed: SelectionStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SelectionStrategy::LeastLoaded);
    }
}
