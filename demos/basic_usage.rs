//! Basic usage example
//!
//! This example demonstrates the basic usage of a3s-dispatch:
//! - Building an engine with a processing closure
//! - Enqueueing items at different priority levels
//! - Reading the statistics snapshot after a graceful shutdown

use a3s_dispatch::{levels, DispatchEngine, EngineConfig, SelectionStrategy};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== A3S Dispatch: Basic Usage Example ===\n");

    let config = EngineConfig::new(2, 2)
        .with_uniform_capacity(256)
        .with_selection(SelectionStrategy::RoundRobin);

    let engine = DispatchEngine::with_fn(config, |item: String| async move {
        // Simulate some work
        tokio::time::sleep(Duration::from_millis(5)).await;
        println!("  processed {item}");
        Ok(())
    })?;

    engine.start().await?;
    println!(
        "✓ Engine started with {} consumers\n",
        engine.config().total_partitions()
    );

    for i in 0..10 {
        let level = if i % 3 == 0 { levels::HIGH } else { levels::NORMAL };
        let accepted = engine.enqueue(format!("item-{i}"), level, None).await;
        println!("enqueue item-{i} at level {level}: accepted={accepted}");
    }

    engine.shutdown(Duration::from_secs(5)).await?;

    let stats = engine.stats();
    println!(
        "\n✓ Drained: enqueued={} processed={} dropped={}",
        stats.total_enqueued, stats.total_processed, stats.total_dropped
    );
    Ok(())
}
