//! The processing function contract
//!
//! The engine's only dependency on business logic: a [`Processor`] supplied at
//! construction, invoked once per item by the consumer loops. Per-item errors
//! are isolated by the engine (logged and counted, never aborting a batch).
//! Delivery is at-most-once: a forced shutdown that exceeds its deadline may
//! abandon in-flight batches.

use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Item processor invoked by the consumer loops
#[async_trait]
pub trait Processor<T>: Send + Sync {
    /// Process one item
    ///
    /// Return `Err` to report a per-item failure; the consumer loop counts it
    /// and continues with the rest of the batch.
    async fn process(&self, item: T) -> Result<()>;
}

/// Adapter turning an async closure into a [`Processor`]
///
/// Useful when the processing logic does not warrant a dedicated type:
///
/// ```rust,ignore
/// let processor = FnProcessor::new(|line: String| async move {
///     println!("{line}");
///     Ok(())
/// });
/// ```
pub struct FnProcessor<F> {
    func: F,
}

impl<F> FnProcessor<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<T, F, Fut> Processor<T> for FnProcessor<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn process(&self, item: T) -> Result<()> {
        (self.func)(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingProcessor {
        seen: AtomicU64,
    }

    #[async_trait]
    impl Processor<u32> for CountingProcessor {
        async fn process(&self, item: u32) -> Result<()> {
            self.seen.fetch_add(u64::from(item), Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_trait_processor() {
        let processor = CountingProcessor {
            seen: AtomicU64::new(0),
        };
        processor.process(3).await.unwrap();
        processor.process(4).await.unwrap();
        assert_eq!(processor.seen.load(Ordering::Relaxed), 7);
    }

    #[tokio::test]
    async fn test_fn_processor() {
        let total = Arc::new(AtomicU64::new(0));
        let captured = Arc::clone(&total);
        let processor = FnProcessor::new(move |item: u32| {
            let total = Arc::clone(&captured);
            async move {
                total.fetch_add(u64::from(item), Ordering::Relaxed);
                Ok(())
            }
        });

        processor.process(5).await.unwrap();
        assert_eq!(total.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_fn_processor_error_passthrough() {
        let processor = FnProcessor::new(|_: u32| async {
            Err(DispatchError::Processing("boom".to_string()))
        });

        let err = processor.process(1).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
