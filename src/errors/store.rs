// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for event stores.

use alloy_primitives::BlockNumber;

use super::NormalizationError;
use crate::BlockRange;

/// Errors that can occur while loading, appending to, or reading from an event store.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{FileEventStore, StoreError};
///
/// match FileEventStore::open("data/events_mainnet.jsonl", key).await {
///     Ok(store) => println!("resuming after {:?}", store.highest_stored_block().await),
///     Err(StoreError::Corrupted { path, line, reason }) => {
///         eprintln!("refusing to trust {path}:{line}: {reason}");
///     }
///     Err(e) => eprintln!("store unavailable: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Store I/O error at {path}: {details}")]
    Io {
        /// Path of the file involved
        path: String,
        /// What was being attempted
        details: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Encoding a row or metadata document failed.
    #[error("Serialization error: {details}")]
    Serialization {
        /// Details about the serialization error
        details: String,
        /// The underlying serialization error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The persisted log failed verification on load.
    ///
    /// `line` is 1-based for event rows and 0 for the metadata sidecar.
    #[error("Corrupted event store {path} at line {line}: {reason}")]
    Corrupted {
        /// Path of the corrupted file
        path: String,
        /// Offending row
        line: usize,
        /// Why the row was rejected
        reason: String,
    },

    /// Appended events conflict with each other or with stored events.
    #[error("Integrity violation: {0}")]
    Integrity(#[from] NormalizationError),

    /// A committed window does not line up with what the store already covers.
    ///
    /// The overlapping range has to be fetched again from scratch.
    #[error("Resume mismatch for window {range}: {details}")]
    ResumeMismatch {
        /// The window being committed
        range: BlockRange,
        /// Highest block covered before the commit
        covered_through: Option<BlockNumber>,
        /// What did not line up
        details: String,
    },

    /// Invalid arguments, such as an inverted read range.
    #[error("Invalid input: {details}")]
    InvalidInput {
        /// Details about what was invalid
        details: String,
    },
}

impl StoreError {
    /// Create an `Io` error for a path.
    pub fn io(path: impl Into<String>, details: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            details: details.into(),
            source,
        }
    }

    /// Create a `Serialization` error from any serialization error.
    pub fn serialization(
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Serialization {
            details: details.into(),
            source: Box::new(source),
        }
    }

    /// Create a `Corrupted` error.
    pub fn corrupted(path: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        StoreError::Corrupted {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a `ResumeMismatch` error.
    pub fn resume_mismatch(
        range: BlockRange,
        covered_through: Option<BlockNumber>,
        details: impl Into<String>,
    ) -> Self {
        StoreError::ResumeMismatch {
            range,
            covered_through,
            details: details.into(),
        }
    }

    /// Create an `InvalidInput` error with details.
    pub fn invalid_input(details: impl Into<String>) -> Self {
        StoreError::InvalidInput {
            details: details.into(),
        }
    }
}
