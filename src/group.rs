//! Priority groups
//!
//! A priority group owns the partitions dedicated to one priority level.
//! Higher levels are pre-allocated proportionally more partitions
//! (`base_partitions * (level + 1)`) so urgent traffic gets more parallel
//! lanes without any dynamic rebalancing.

use crate::partition::Partition;
use crate::selector::Selector;
use crate::stats::{PartitionMetrics, PartitionSnapshot};
use std::sync::Arc;

/// Priority level ordinal; higher = more urgent
pub type Level = usize;

/// Conventional level names for the default three-level configuration
pub mod levels {
    use super::Level;

    pub const NORMAL: Level = 0;
    pub const HIGH: Level = 1;
    pub const CRITICAL: Level = 2;
}

/// The set of partitions dedicated to one priority level
///
/// Topology is fixed at construction and safe for unsynchronized concurrent
/// reads; all mutable state lives inside the partitions themselves.
pub struct PriorityGroup<T> {
    level: Level,
    batch_size: usize,
    partitions: Vec<Partition<T>>,
    metrics_view: Vec<Arc<PartitionMetrics>>,
    selector: Arc<dyn Selector>,
}

impl<T: Send + 'static> PriorityGroup<T> {
    /// Create a group with `base_partitions * (level + 1)` partitions
    pub fn new(
        level: Level,
        base_partitions: usize,
        capacity: usize,
        batch_size: usize,
        selector: Arc<dyn Selector>,
    ) -> Self {
        let count = base_partitions * (level + 1);
        let partitions: Vec<Partition<T>> = (0..count)
            .map(|index| Partition::new(level, index, capacity))
            .collect();
        let metrics_view = partitions.iter().map(|p| p.metrics()).collect();
        Self {
            level,
            batch_size,
            partitions,
            metrics_view,
            selector,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Batch size used by this group's consumers
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partitions(&self) -> &[Partition<T>] {
        &self.partitions
    }

    /// Pick a destination partition for an item
    pub fn select(&self, affinity_key: Option<&str>) -> usize {
        self.selector.select(affinity_key, &self.metrics_view)
    }

    /// Stop accepting writes on every partition
    pub fn complete_all(&self) {
        for partition in &self.partitions {
            partition.complete();
        }
    }

    /// Capture a snapshot row per partition
    pub fn snapshot_into(&self, out: &mut Vec<PartitionSnapshot>) {
        for partition in &self.partitions {
            out.push(PartitionSnapshot::capture(
                self.level,
                partition.index(),
                partition.capacity(),
                &partition.metrics(),
            ));
        }
    }
}
