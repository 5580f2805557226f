//! Lock-free statistics for partitions and the engine
//!
//! Every counter is an independent atomic updated with relaxed ordering so the
//! hot path never takes a lock. Snapshots read each counter individually and
//! are therefore eventually consistent rather than a linearizable cross-counter
//! view; they are meant for observability, never for correctness decisions.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Per-partition atomic counters
///
/// One instance per partition, shared between producers (success, fallback,
/// dropped, depth), the consumer loop (processed, errors, depth), and the
/// selectors (depth).
#[derive(Debug, Default)]
pub struct PartitionMetrics {
    /// Items accepted by the originally selected partition
    success: AtomicU64,
    /// Items accepted after falling back from another partition or level
    fallback: AtomicU64,
    /// Items rejected after the full fallback chain was exhausted
    dropped: AtomicU64,
    /// Items handed to the processing function (including failed ones)
    processed: AtomicU64,
    /// Items for which the processing function returned an error
    errors: AtomicU64,
    /// Current queue depth
    depth: AtomicUsize,
}

impl PartitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallback.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_depth(&self) {
        self.depth.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decr_depth(&self) {
        // Saturating: a racing snapshot may observe 0 between the channel
        // write and the depth increment.
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(1))
            });
    }

    /// Current queue depth (approximate under concurrent writers)
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn fallback(&self) -> u64 {
        self.fallback.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of one partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    /// Priority level the partition belongs to
    pub level: usize,
    /// Partition index within its priority group
    pub index: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Queue depth at snapshot time
    pub depth: usize,
    pub success: u64,
    pub fallback: u64,
    pub dropped: u64,
    pub processed: u64,
    pub errors: u64,
}

impl PartitionSnapshot {
    pub(crate) fn capture(
        level: usize,
        index: usize,
        capacity: usize,
        metrics: &PartitionMetrics,
    ) -> Self {
        Self {
            level,
            index,
            capacity,
            depth: metrics.depth(),
            success: metrics.success(),
            fallback: metrics.fallback(),
            dropped: metrics.dropped(),
            processed: metrics.processed(),
            errors: metrics.errors(),
        }
    }

    /// Items this partition accepted (direct plus fallback)
    pub fn accepted(&self) -> u64 {
        self.success + self.fallback
    }
}

/// Engine statistics snapshot
///
/// Aggregated across all partitions without pausing producers or consumers.
/// `total_enqueued` counts every enqueue attempt (accepted plus dropped), so
/// after a full drain `total_enqueued == total_processed + total_dropped`.
///
/// # Example
///
/// ```rust,ignore
/// let stats = engine.stats();
/// println!("enqueued={} processed={} dropped={}",
///     stats.total_enqueued, stats.total_processed, stats.total_dropped);
///
/// for p in &stats.partitions {
///     println!("L{}/P{}: depth {}/{}", p.level, p.index, p.depth, p.capacity);
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_enqueued: u64,
    pub total_processed: u64,
    pub total_dropped: u64,
    pub total_errors: u64,
    pub partitions: Vec<PartitionSnapshot>,
}

impl EngineStats {
    /// Aggregate a set of partition snapshots into engine totals
    pub fn from_partitions(partitions: Vec<PartitionSnapshot>) -> Self {
        let mut stats = Self {
            partitions,
            ..Default::default()
        };
        for p in &stats.partitions {
            stats.total_enqueued += p.accepted() + p.dropped;
            stats.total_processed += p.processed;
            stats.total_dropped += p.dropped;
            stats.total_errors += p.errors;
        }
        stats
    }

    /// Snapshots for one priority level
    pub fn level(&self, level: usize) -> Vec<&PartitionSnapshot> {
        self.partitions.iter().filter(|p| p.level == level).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = PartitionMetrics::new();
        metrics.record_success();
        metrics.record_success();
        metrics.record_fallback();
        metrics.record_dropped();
        metrics.record_processed();
        metrics.record_error();

        assert_eq!(metrics.success(), 2);
        assert_eq!(metrics.fallback(), 1);
        assert_eq!(metrics.dropped(), 1);
        assert_eq!(metrics.processed(), 1);
        assert_eq!(metrics.errors(), 1);
    }

    #[test]
    fn test_depth_tracking() {
        let metrics = PartitionMetrics::new();
        metrics.incr_depth();
        metrics.incr_depth();
        assert_eq!(metrics.depth(), 2);
        metrics.decr_depth();
        assert_eq!(metrics.depth(), 1);
    }

    #[test]
    fn test_depth_never_underflows() {
        let metrics = PartitionMetrics::new();
        metrics.decr_depth();
        assert_eq!(metrics.depth(), 0);
    }

    #[test]
    fn test_snapshot_capture() {
        let metrics = PartitionMetrics::new();
        metrics.record_success();
        metrics.record_fallback();
        metrics.incr_depth();

        let snap = PartitionSnapshot::capture(1, 3, 64, &metrics);
        assert_eq!(snap.level, 1);
        assert_eq!(snap.index, 3);
        assert_eq!(snap.capacity, 64);
        assert_eq!(snap.depth, 1);
        assert_eq!(snap.accepted(), 2);
    }

    #[test]
    fn test_engine_stats_aggregation() {
        let m1 = PartitionMetrics::new();
        m1.record_success();
        m1.record_success();
        m1.record_processed();
        m1.record_processed();

        let m2 = PartitionMetrics::new();
        m2.record_fallback();
        m2.record_dropped();
        m2.record_processed();
        m2.record_error();

        let stats = EngineStats::from_partitions(vec![
            PartitionSnapshot::capture(0, 0, 8, &m1),
            PartitionSnapshot::capture(1, 0, 8, &m2),
        ]);

        assert_eq!(stats.total_enqueued, 4); // 2 success + 1 fallback + 1 dropped
        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.total_dropped, 1);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.level(1).len(), 1);
    }

    #[test]
    fn test_engine_stats_serialization() {
        let metrics = PartitionMetrics::new();
        metrics.record_success();
        let stats =
            EngineStats::from_partitions(vec![PartitionSnapshot::capture(0, 0, 16, &metrics)]);

        let json = serde_json::to_string(&stats).unwrap();
        let parsed: EngineStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_enqueued, 1);
        assert_eq!(parsed.partitions.len(), 1);
    }
}
