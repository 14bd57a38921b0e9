// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for chain event sources.
//!
//! This module provides error types for [`ChainEventSource`](crate::ChainEventSource)
//! implementations, separating transient failures (worth retrying) from logs that
//! can never be turned into a [`TransferEvent`](crate::TransferEvent).

use std::time::Duration;

use crate::BlockRange;

/// Errors that can occur while fetching transfer logs from a chain.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{ChainEventSource, SourceError};
///
/// match source.fetch_logs(range).await {
///     Ok(events) => println!("{} events", events.len()),
///     Err(e) if e.is_transient() => eprintln!("will retry: {e}"),
///     Err(e) => eprintln!("giving up: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The RPC call failed (network, rate limit, provider error).
    #[error("Failed to fetch logs for blocks {range}")]
    RpcFailed {
        /// Blocks being fetched
        range: BlockRange,
        /// The underlying provider error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The RPC call did not answer in time.
    #[error("Fetching logs for blocks {range} timed out after {timeout:?}")]
    Timeout {
        /// Blocks being fetched
        range: BlockRange,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A log is missing fields required for ordering or identity.
    #[error("Incomplete log in blocks {range}: {details}")]
    IncompleteLog {
        /// Blocks being fetched
        range: BlockRange,
        /// Which field is missing
        details: String,
    },

    /// The node returned a log flagged as removed by a reorg.
    ///
    /// Only finalized ranges are indexed; a removed log means the range is not final.
    #[error("Removed log in blocks {range}: {details}")]
    RemovedLog {
        /// Blocks being fetched
        range: BlockRange,
        /// Which log was removed
        details: String,
    },

    /// The chain head could not be read.
    #[error("Failed to read latest block number")]
    HeadUnavailable {
        /// The underlying provider error, or the elapsed timeout
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A log does not decode as an ERC-20 `Transfer`.
    #[error("Failed to decode transfer log: {details}")]
    DecodeFailed {
        /// Details about why the decode failed
        details: String,
    },
}

impl SourceError {
    /// Helper to create an `RpcFailed` error from any error type.
    pub fn rpc_failed(
        range: BlockRange,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SourceError::RpcFailed {
            range,
            source: Box::new(source),
        }
    }

    /// Helper to create a `HeadUnavailable` error from any error type.
    pub fn head_unavailable(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        SourceError::HeadUnavailable {
            source: Box::new(source),
        }
    }

    /// Create an `IncompleteLog` error.
    pub fn incomplete_log(range: BlockRange, details: impl Into<String>) -> Self {
        SourceError::IncompleteLog {
            range,
            details: details.into(),
        }
    }

    /// Create a `RemovedLog` error.
    pub fn removed_log(range: BlockRange, details: impl Into<String>) -> Self {
        SourceError::RemovedLog {
            range,
            details: details.into(),
        }
    }

    /// Create a `DecodeFailed` error with details.
    pub fn decode_failed(details: impl Into<String>) -> Self {
        SourceError::DecodeFailed {
            details: details.into(),
        }
    }

    /// Whether retrying the same request may succeed
    ///
    /// RPC failures and timeouts are transient. A removed log is transient too: the
    /// range was not final yet. Incomplete or undecodable logs are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RpcFailed { .. }
                | SourceError::Timeout { .. }
                | SourceError::RemovedLog { .. }
                | SourceError::HeadUnavailable { .. }
        )
    }
}
