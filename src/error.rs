//! Error types for the dispatch engine
//!
//! This module defines the error types used throughout the dispatch engine.
//! All errors implement the `std::error::Error` trait via `thiserror::Error`.
//!
//! # Error Handling
//!
//! The [`DispatchError`] enum covers the hard failure conditions:
//! - Configuration errors (rejected synchronously at construction)
//! - Lifecycle errors (starting twice, enqueueing after shutdown)
//! - Processing errors raised by the caller-supplied processor
//!
//! Ordinary backpressure is deliberately *not* represented here. A full
//! partition, an exhausted fallback chain, or a timed-out last-resort write
//! all surface as a `false` return from `enqueue`/`try_enqueue` plus a bump
//! of the dropped counter, so the caller can apply its own retry or reject
//! policy (for example an HTTP 503).

use thiserror::Error;

/// Dispatch engine error type
///
/// # Variants
///
/// * `Config` - Invalid construction-time configuration (e.g., zero partitions)
/// * `AlreadyStarted` - `start` was called on an engine that left the Created state
/// * `ShutdownInProgress` - Operation requires a running engine
/// * `Processing` - The processing function failed for one item
/// * `DrainTimeout` - Consumers did not finish within the shutdown deadline
/// * `Other` - Catch-all for unexpected errors
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine already started
    #[error("Engine already started")]
    AlreadyStarted,

    /// Shutdown in progress
    #[error("Engine is shutting down, not accepting new items")]
    ShutdownInProgress,

    /// Item processing error
    #[error("Processing error: {0}")]
    Processing(String),

    /// Drain deadline exceeded during shutdown
    #[error("Drain timed out after {0:?}, stragglers abandoned")]
    DrainTimeout(std::time::Duration),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result type alias using DispatchError
///
/// Convenience type alias for `std::result::Result<T, DispatchError>`.
/// Used throughout the library for consistent error handling.
pub type Result<T> = std::result::Result<T, DispatchError>;
