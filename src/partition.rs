//! Bounded partition queues
//!
//! A partition is one bounded FIFO lane inside a priority group: a
//! multi-producer channel written by enqueue callers and read by exactly one
//! consumer task. Three write modes are supported: a non-blocking try-write,
//! a blocking write bounded by a timeout, and a completion signal that stops
//! accepting writes while queued items drain.

use crate::stats::PartitionMetrics;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

/// Partition index within a priority group
pub type PartitionId = usize;

/// One bounded FIFO lane
///
/// Invariants: queue depth never exceeds `capacity`; the receiver is taken
/// exactly once (by the consumer task); any number of producers may write
/// concurrently. All write modes hand the item back on rejection so the
/// caller can continue the fallback chain without cloning.
pub struct Partition<T> {
    level: usize,
    index: PartitionId,
    capacity: usize,
    sender: RwLock<Option<mpsc::Sender<T>>>,
    receiver: Mutex<Option<mpsc::Receiver<T>>>,
    metrics: Arc<PartitionMetrics>,
}

impl<T: Send + 'static> Partition<T> {
    /// Create a partition with the given capacity
    pub fn new(level: usize, index: PartitionId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            level,
            index,
            capacity,
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            metrics: Arc::new(PartitionMetrics::new()),
        }
    }

    /// Priority level this partition belongs to
    pub fn level(&self) -> usize {
        self.level
    }

    /// Index within the priority group
    pub fn index(&self) -> PartitionId {
        self.index
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shared counter handle for this partition
    pub fn metrics(&self) -> Arc<PartitionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Current queue depth (approximate under concurrent writers)
    pub fn depth(&self) -> usize {
        self.metrics.depth()
    }

    /// Non-blocking write
    ///
    /// Returns the item on rejection, whether the queue is full or already
    /// completed.
    pub fn try_write(&self, item: T) -> Result<(), T> {
        let guard = self.sender.read();
        let tx = match guard.as_ref() {
            Some(tx) => tx,
            None => return Err(item),
        };
        match tx.try_send(item) {
            Ok(()) => {
                self.metrics.incr_depth();
                Ok(())
            }
            Err(TrySendError::Full(item)) | Err(TrySendError::Closed(item)) => Err(item),
        }
    }

    /// Blocking write bounded by `timeout`
    ///
    /// Suspends until capacity frees up, the timeout elapses, or the
    /// partition completes. Returns the item on rejection.
    pub async fn write_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        // Clone the sender out of the guard; holding a lock across the await
        // would block complete() for the full timeout.
        let tx = match self.sender.read().as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(item),
        };
        match tx.send_timeout(item, timeout).await {
            Ok(()) => {
                self.metrics.incr_depth();
                Ok(())
            }
            Err(SendTimeoutError::Timeout(item)) | Err(SendTimeoutError::Closed(item)) => Err(item),
        }
    }

    /// Stop accepting writes; queued items remain readable until drained
    ///
    /// Once every in-flight writer clone is released, the consumer observes
    /// end-of-queue and exits after flushing. Idempotent.
    pub fn complete(&self) {
        self.sender.write().take();
    }

    /// True once `complete` has been called
    pub fn is_completed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Take the receiver for the consumer task
    ///
    /// Returns `None` on the second call; the single-reader discipline is
    /// enforced by handing the receiver out exactly once.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<T>> {
        self.receiver.lock().take()
    }
}
