//! Priority fallback example
//!
//! Saturates a tiny high-priority group and shows the fallback chain at work:
//! spill into sibling partitions, then into the lower level, with the drop
//! events surfaced through the event stream.

use a3s_dispatch::{events, levels, DispatchEngine, EngineConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== A3S Dispatch: Priority Fallback Example ===\n");

    // Two levels, one base partition, deliberately tiny capacities and a slow
    // processor so the high-priority group saturates quickly.
    let config = EngineConfig::new(2, 1)
        .with_capacities(vec![8, 2])
        .with_write_timeout(Duration::from_millis(100));

    let engine = DispatchEngine::with_fn(config, |item: u32| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("  processed item {item}");
        Ok(())
    })?;

    let mut drops = engine.subscribe_filtered(|e| e.key == events::ITEM_DROPPED);
    engine.start().await?;

    for i in 0..20u32 {
        let accepted = engine.enqueue(i, levels::HIGH, None).await;
        if !accepted {
            println!("item {i} rejected (backpressure)");
        }
    }

    let stats = engine.stats();
    for p in &stats.partitions {
        println!(
            "level {} partition {}: success={} fallback={} dropped={} depth={}/{}",
            p.level, p.index, p.success, p.fallback, p.dropped, p.depth, p.capacity
        );
    }

    engine.shutdown(Duration::from_secs(5)).await?;

    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(50), drops.recv()).await
    {
        println!("drop event: {:?}", event.payload);
    }

    println!(
        "\n✓ Done: enqueued={} processed={} dropped={}",
        engine.stats().total_enqueued,
        engine.stats().total_processed,
        engine.stats().total_dropped
    );
    Ok(())
}
