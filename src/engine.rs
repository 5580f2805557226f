//! The dispatch engine
//!
//! Owns every priority group, exposes the enqueue operations, runs one
//! background consumer per partition, and coordinates shutdown.
//!
//! # Enqueue contract
//!
//! [`DispatchEngine::enqueue`] walks the full fallback chain: selected
//! partition, siblings in ring order, progressively lower priority groups
//! (when enabled), and finally a bounded blocking write against the original
//! destination. [`DispatchEngine::try_enqueue`] is the synchronous variant
//! for callers that cannot tolerate suspension: same-priority fallback only.
//! Both return `false` for ordinary backpressure instead of raising an error.
//!
//! Cross-priority fallback trades priority purity for forward progress under
//! saturation: a saturated level spills into lower-priority lanes, so
//! priority inversion is possible. Callers that cannot accept that disable it
//! in [`EngineConfig`].

use crate::config::EngineConfig;
use crate::error::{DispatchError, Result};
use crate::event::{events, DispatchEvent, EventEmitter, EventStream};
use crate::group::{Level, PriorityGroup};
use crate::processor::{FnProcessor, Processor};
use crate::stats::{EngineStats, PartitionSnapshot};
use crate::worker;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_DRAINING: u8 = 2;
const STATE_DISPOSED: u8 = 3;

/// Engine lifecycle state
///
/// Transitions are one-directional and irreversible:
/// `Created -> Running -> Draining -> Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Allocated, consumers not started, not accepting traffic
    Created,
    /// Consumers running, accepting enqueues
    Running,
    /// Writers completed, consumers finishing in-flight work
    Draining,
    /// All resources released; enqueues fail immediately
    Disposed,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CREATED => EngineState::Created,
            STATE_RUNNING => EngineState::Running,
            STATE_DRAINING => EngineState::Draining,
            _ => EngineState::Disposed,
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Created => "created",
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

struct WorkerHandle {
    level: Level,
    index: usize,
    handle: JoinHandle<()>,
}

/// Partitioned, priority-aware, bounded dispatch engine
///
/// Generic over the item type; instantiate once per stream (for example once
/// for request dispatch and once for log-line dispatch) rather than
/// duplicating the engine.
pub struct DispatchEngine<T> {
    config: EngineConfig,
    groups: Vec<PriorityGroup<T>>,
    processor: Arc<dyn Processor<T>>,
    state: AtomicU8,
    cancel: CancellationToken,
    workers: tokio::sync::Mutex<Vec<WorkerHandle>>,
    events: EventEmitter,
}

impl<T: Send + 'static> DispatchEngine<T> {
    /// Create an engine in the `Created` state
    ///
    /// Validates the configuration and pre-allocates every priority group;
    /// partitions and groups are never resized afterwards. Fails fast with
    /// [`DispatchError::Config`] on invalid values.
    pub fn new(config: EngineConfig, processor: Arc<dyn Processor<T>>) -> Result<Self> {
        config.validate()?;

        let groups = (0..config.levels)
            .map(|level| {
                PriorityGroup::new(
                    level,
                    config.base_partitions,
                    config.capacities[level],
                    config.batch_sizes[level],
                    config.selection.create_selector(),
                )
            })
            .collect();

        Ok(Self {
            config,
            groups,
            processor,
            state: AtomicU8::new(STATE_CREATED),
            cancel: CancellationToken::new(),
            workers: tokio::sync::Mutex::new(Vec::new()),
            events: EventEmitter::new(128),
        })
    }

    /// Create an engine from an async closure
    pub fn with_fn<F, Fut>(config: EngineConfig, func: F) -> Result<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(config, Arc::new(FnProcessor::new(func)))
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Engine configuration (immutable after construction)
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start the consumer tasks, transitioning `Created -> Running`
    pub async fn start(&self) -> Result<()> {
        self.state
            .compare_exchange(
                STATE_CREATED,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| DispatchError::AlreadyStarted)?;

        let mut workers = self.workers.lock().await;
        for group in &self.groups {
            for partition in group.partitions() {
                let receiver = partition.take_receiver().ok_or_else(|| {
                    DispatchError::Other(format!(
                        "receiver for partition {}/{} already taken",
                        partition.level(),
                        partition.index()
                    ))
                })?;
                let handle = tokio::spawn(worker::run_worker(
                    partition.level(),
                    partition.index(),
                    receiver,
                    group.batch_size(),
                    Arc::clone(&self.processor),
                    partition.metrics(),
                    self.cancel.clone(),
                ));
                workers.push(WorkerHandle {
                    level: partition.level(),
                    index: partition.index(),
                    handle,
                });
            }
        }

        tracing::info!(
            levels = self.config.levels,
            consumers = workers.len(),
            "dispatch engine started"
        );
        self.events
            .emit(DispatchEvent::empty(events::ENGINE_STARTED));
        Ok(())
    }

    /// Enqueue with the full fallback chain (may suspend)
    ///
    /// Selected partition, siblings in ring order, lower priority groups when
    /// cross-priority fallback is enabled, then a bounded blocking write
    /// against the originally selected partition. Returns `false` when every
    /// stage rejected the item (counted on the dropped counter) or when the
    /// engine is not running.
    pub async fn enqueue(&self, item: T, level: Level, affinity_key: Option<&str>) -> bool {
        if self.state() != EngineState::Running {
            return false;
        }
        let group = match self.groups.get(level) {
            Some(group) => group,
            None => {
                tracing::warn!(level, "enqueue with out-of-range priority level");
                return false;
            }
        };

        let origin = group.select(affinity_key);
        let mut item = match Self::offer_to_group(group, origin, item, true) {
            Ok(()) => return true,
            Err(item) => item,
        };

        if self.config.cross_priority_fallback {
            for lower in (0..level).rev() {
                let fallback_group = &self.groups[lower];
                let start = fallback_group.select(affinity_key);
                item = match Self::offer_to_group(fallback_group, start, item, false) {
                    Ok(()) => return true,
                    Err(item) => item,
                };
            }
        }

        // Last resort: bounded wait on the original destination.
        let partition = &group.partitions()[origin];
        match partition
            .write_timeout(item, self.config.write_timeout)
            .await
        {
            Ok(()) => {
                partition.metrics().record_success();
                true
            }
            Err(_item) => {
                partition.metrics().record_dropped();
                self.emit_dropped(level, origin, "timeout");
                false
            }
        }
    }

    /// Enqueue without suspension: same-priority fallback only
    ///
    /// No cross-priority escalation and no blocking wait. Returns `false`
    /// when the selected partition and every sibling rejected the item; the
    /// dropped counter is incremented exactly once, on the originally
    /// selected partition.
    pub fn try_enqueue(&self, item: T, level: Level, affinity_key: Option<&str>) -> bool {
        if self.state() != EngineState::Running {
            return false;
        }
        let group = match self.groups.get(level) {
            Some(group) => group,
            None => {
                tracing::warn!(level, "try_enqueue with out-of-range priority level");
                return false;
            }
        };

        let origin = group.select(affinity_key);
        match Self::offer_to_group(group, origin, item, true) {
            Ok(()) => true,
            Err(_item) => {
                group.partitions()[origin].metrics().record_dropped();
                self.emit_dropped(level, origin, "capacity");
                false
            }
        }
    }

    /// Walk a group in ring order starting from `origin`
    ///
    /// A write accepted at `origin` counts as success when `direct` is set
    /// (the caller targeted this group); every other acceptance counts as
    /// fallback. Returns the item when the whole ring rejected it.
    fn offer_to_group(
        group: &PriorityGroup<T>,
        origin: usize,
        mut item: T,
        direct: bool,
    ) -> std::result::Result<(), T> {
        let count = group.partition_count();
        for step in 0..count {
            let index = (origin + step) % count;
            let partition = &group.partitions()[index];
            match partition.try_write(item) {
                Ok(()) => {
                    if step == 0 && direct {
                        partition.metrics().record_success();
                    } else {
                        partition.metrics().record_fallback();
                    }
                    return Ok(());
                }
                Err(rejected) => item = rejected,
            }
        }
        Err(item)
    }

    fn emit_dropped(&self, level: Level, partition: usize, reason: &str) {
        tracing::debug!(level, partition, reason, "item dropped");
        self.events.emit(DispatchEvent::with_map(
            events::ITEM_DROPPED,
            HashMap::from([
                ("level".to_string(), serde_json::json!(level)),
                ("partition".to_string(), serde_json::json!(partition)),
                ("reason".to_string(), serde_json::json!(reason)),
            ]),
        ));
    }

    /// Aggregate statistics across every partition
    ///
    /// Lock-free and eventually consistent; producers and consumers keep
    /// running while the snapshot is taken.
    pub fn stats(&self) -> EngineStats {
        let mut rows: Vec<PartitionSnapshot> = Vec::with_capacity(self.config.total_partitions());
        for group in &self.groups {
            group.snapshot_into(&mut rows);
        }
        EngineStats::from_partitions(rows)
    }

    /// Graceful shutdown: `Running -> Draining -> Disposed`
    ///
    /// Completes every partition so queues drain through normal consumption,
    /// then joins the consumers within `timeout`. Stragglers are abandoned
    /// with a warning (the shared cancellation signal makes them exit at the
    /// next read), and disposal proceeds regardless; cleanup never hangs
    /// process exit. Returns [`DispatchError::DrainTimeout`] when any
    /// consumer was abandoned.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_DRAINING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            // A never-started engine can be disposed directly.
            if self
                .state
                .compare_exchange(
                    STATE_CREATED,
                    STATE_DISPOSED,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                for group in &self.groups {
                    group.complete_all();
                }
                return Ok(());
            }
            return Err(DispatchError::ShutdownInProgress);
        }

        tracing::info!(?timeout, "dispatch engine draining");
        self.events
            .emit(DispatchEvent::empty(events::SHUTDOWN_STARTED));

        for group in &self.groups {
            group.complete_all();
        }

        let deadline = Instant::now() + timeout;
        let mut stragglers = Vec::new();
        let mut workers = self.workers.lock().await;
        for WorkerHandle {
            level,
            index,
            handle,
        } in workers.drain(..)
        {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, handle).await.is_err() {
                stragglers.push((level, index));
            }
        }
        drop(workers);

        // Cooperative stop for anything still running; abandoned tasks exit
        // at their next read instead of holding up disposal.
        self.cancel.cancel();
        self.state.store(STATE_DISPOSED, Ordering::SeqCst);

        for (level, index) in &stragglers {
            tracing::warn!(
                level,
                partition = index,
                "consumer did not finish within the drain deadline, abandoned"
            );
            self.events.emit(DispatchEvent::with_map(
                events::CONSUMER_ABANDONED,
                HashMap::from([
                    ("level".to_string(), serde_json::json!(level)),
                    ("partition".to_string(), serde_json::json!(index)),
                ]),
            ));
        }

        tracing::info!("dispatch engine disposed");
        self.events
            .emit(DispatchEvent::empty(events::SHUTDOWN_COMPLETE));

        if stragglers.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::DrainTimeout(timeout))
        }
    }

    /// Subscribe to all engine lifecycle events as an `EventStream`
    pub fn subscribe_stream(&self) -> EventStream {
        self.events.subscribe_stream()
    }

    /// Subscribe to filtered engine lifecycle events as an `EventStream`
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&DispatchEvent) -> bool + Send + Sync + 'static,
    ) -> EventStream {
        self.events.subscribe_filtered(filter)
    }
}
