//! # A3S Dispatch
//!
//! A partitioned, priority-aware, bounded dispatch engine for async item
//! processing.
//!
//! The engine accepts items from many concurrent producers, routes them into
//! capacity-limited partitions segregated by priority, applies a multi-level
//! fallback policy when partitions saturate, and drains each partition
//! through a dedicated batch-consuming worker.
//!
//! ## Core concepts
//!
//! - **Partition**: one bounded FIFO lane, written by many producers and read
//!   by exactly one consumer task.
//! - **Priority group**: the partitions dedicated to one level; level `n`
//!   gets `base_partitions * (n + 1)` lanes, so urgent traffic has more
//!   parallelism.
//! - **Selection**: affinity hashing (per-key ordering), round-robin, or
//!   least-loaded, chosen once per engine.
//! - **Fallback chain**: siblings in ring order, then lower priority groups
//!   (optional), then a bounded blocking write. Exhaustion is reported as a
//!   `false` return, never an error, so callers keep their own backpressure
//!   policy.
//! - **Statistics**: per-partition atomic counters aggregated into
//!   eventually-consistent snapshots.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use a3s_dispatch::{DispatchEngine, EngineConfig, SelectionStrategy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> a3s_dispatch::Result<()> {
//!     let config = EngineConfig::new(2, 4)
//!         .with_selection(SelectionStrategy::Affinity);
//!
//!     let engine = DispatchEngine::with_fn(config, |item: String| async move {
//!         println!("processing {item}");
//!         Ok(())
//!     })?;
//!     engine.start().await?;
//!
//!     let accepted = engine.enqueue("hello".to_string(), 1, Some("session-1")).await;
//!     assert!(accepted);
//!
//!     engine.shutdown(Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod group;
pub mod partition;
pub mod processor;
pub mod selector;
pub mod stats;

mod worker;

// Re-exports
pub use config::EngineConfig;
pub use engine::{DispatchEngine, EngineState};
pub use error::{DispatchError, Result};
pub use event::{events, DispatchEvent, EventEmitter, EventPayload, EventStream};
pub use group::{levels, Level, PriorityGroup};
pub use partition::{Partition, PartitionId};
pub use processor::{FnProcessor, Processor};
pub use selector::{
    AffinitySelector, CustomSelector, LeastLoadedSelector, RoundRobinSelector, SelectionStrategy,
    Selector,
};
pub use stats::{EngineStats, PartitionMetrics, PartitionSnapshot};
