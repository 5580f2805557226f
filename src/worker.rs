//! Per-partition consumer loops
//!
//! Exactly one worker task per partition, preserving the single-reader
//! discipline. The loop waits for an item, greedily accumulates a batch up to
//! the group's batch size from whatever is already queued, then flushes the
//! batch sequentially through the processor. A failing item is logged and
//! counted without aborting the batch or the loop.
//!
//! Exit conditions: the partition completed and drained (normal shutdown), or
//! the engine's cancellation token fired (forced shutdown past the drain
//! deadline, abandoning whatever is still queued).

use crate::processor::Processor;
use crate::stats::PartitionMetrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) async fn run_worker<T: Send + 'static>(
    level: usize,
    index: usize,
    mut receiver: mpsc::Receiver<T>,
    batch_size: usize,
    processor: Arc<dyn Processor<T>>,
    metrics: Arc<PartitionMetrics>,
    cancel: CancellationToken,
) {
    let mut batch = Vec::with_capacity(batch_size);
    loop {
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };
        metrics.decr_depth();
        batch.push(first);

        // Top up from items already queued; an empty queue flushes what we
        // have rather than waiting for a full batch.
        while batch.len() < batch_size {
            match receiver.try_recv() {
                Ok(item) => {
                    metrics.decr_depth();
                    batch.push(item);
                }
                Err(_) => break,
            }
        }

        flush(level, index, &mut batch, &processor, &metrics).await;
    }
    tracing::debug!(level, partition = index, "dispatch worker exited");
}

/// Flush a batch sequentially, isolating per-item failures
async fn flush<T: Send + 'static>(
    level: usize,
    index: usize,
    batch: &mut Vec<T>,
    processor: &Arc<dyn Processor<T>>,
    metrics: &Arc<PartitionMetrics>,
) {
    for item in batch.drain(..) {
        let outcome = processor.process(item).await;
        metrics.record_processed();
        if let Err(error) = outcome {
            metrics.record_error();
            tracing::warn!(level, partition = index, %error, "item processing failed");
        }
    }
}
