//! Error types for the holdscan library.
//!
//! This module provides strongly-typed errors for all public APIs in holdscan.
//! It follows a hybrid approach:
//!
//! - **Module-specific errors** for fine-grained error handling (`ReplayError`,
//!   `StoreError`, etc.)
//! - **Unified error type** (`HoldscanError`) for convenience when you don't need
//!   to distinguish between error sources
//!
//! # Architecture
//!
//! Each major module has its own error type:
//! - [`NormalizationError`] - Integrity violations found while sorting and deduplicating
//! - [`StoreError`] - Event store I/O, corruption, and resume mismatches
//! - [`ReplayError`] - Ledger build failures (negative balances, non-canonical input)
//! - [`QueryError`] - Balance queries past the built range
//! - [`SourceError`] - Failures fetching logs from a chain
//! - [`IngestError`] - Ingestion runs that could not complete
//! - [`ConfigError`] - Missing or invalid per-chain configuration
//!
//! # Examples
//!
//! ## Fine-grained error handling
//!
//! ```rust,ignore
//! use holdscan::{LedgerBuilder, ReplayError};
//!
//! match LedgerBuilder::new(deployment_block).build(&events, target_block) {
//!     Ok(ledger) => println!("{} holders", ledger.addresses_with_activity().len()),
//!     Err(ReplayError::InsufficientBalance { address, event, .. }) => {
//!         eprintln!("{address} overspends at {event}: the log is missing an event");
//!     }
//!     Err(e) => eprintln!("Other error: {e}"),
//! }
//! ```
//!
//! ## Using the unified error type
//!
//! ```rust,ignore
//! use holdscan::{HoldscanError, LedgerPipeline};
//!
//! async fn example() -> Result<(), HoldscanError> {
//!     let run = pipeline.run(target_block).await?;
//!     // Errors automatically convert to HoldscanError via From implementations
//!     Ok(())
//! }
//! ```

mod config;
mod ingest;
mod normalize;
mod query;
mod replay;
mod source;
mod store;

pub use config::ConfigError;
pub use ingest::IngestError;
pub use normalize::NormalizationError;
pub use query::QueryError;
pub use replay::ReplayError;
pub use source::SourceError;
pub use store::StoreError;

/// Unified error type for all holdscan operations.
///
/// All module-specific error types automatically convert to `HoldscanError` via
/// `From` implementations, so you can use `?` to propagate errors naturally.
#[derive(Debug, thiserror::Error)]
pub enum HoldscanError {
    /// Error from event normalization.
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// Error from an event store.
    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    /// Error from ledger replay.
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    /// Error from a balance query.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Error from a chain event source.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Error from ingestion.
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// Error from configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
