//! Dual dispatch example
//!
//! The engine is generic over its item type, so the same implementation
//! serves both the request path and the logging path of a service: one
//! instance dispatches request jobs, a second instance dispatches log lines.

use a3s_dispatch::{levels, DispatchEngine, EngineConfig, SelectionStrategy};
use std::time::Duration;

/// A unit of request work
#[derive(Debug)]
struct RequestJob {
    session: String,
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== A3S Dispatch: Dual Dispatch Example ===\n");

    // Request engine: affinity keeps each session's requests in order.
    let requests = DispatchEngine::with_fn(
        EngineConfig::new(3, 2).with_selection(SelectionStrategy::Affinity),
        |job: RequestJob| async move {
            println!("  [request] {} {}", job.session, job.path);
            Ok(())
        },
    )?;

    // Log engine: no ordering requirement, spread by least-loaded.
    let logs = DispatchEngine::with_fn(
        EngineConfig::new(1, 4).with_selection(SelectionStrategy::LeastLoaded),
        |line: String| async move {
            println!("  [log] {line}");
            Ok(())
        },
    )?;

    requests.start().await?;
    logs.start().await?;

    for i in 0..6 {
        let session = format!("session-{}", i % 2);
        let job = RequestJob {
            session: session.clone(),
            path: format!("/api/items/{i}"),
        };
        let level = if i % 2 == 0 { levels::CRITICAL } else { levels::NORMAL };
        requests.enqueue(job, level, Some(&session)).await;
        logs.enqueue(format!("handled request {i}"), 0, None).await;
    }

    requests.shutdown(Duration::from_secs(5)).await?;
    logs.shutdown(Duration::from_secs(5)).await?;

    println!(
        "\n✓ requests processed={} / logs processed={}",
        requests.stats().total_processed,
        logs.stats().total_processed
    );
    Ok(())
}
