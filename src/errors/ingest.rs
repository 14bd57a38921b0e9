// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for ingestion.

use super::{SourceError, StoreError};
use crate::BlockRange;

/// Errors that stop an ingestion run.
///
/// Windows committed before the failure stay committed; the next run resumes from
/// the store's coverage.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A window kept failing after every retry was spent.
    #[error("Window {range} failed after {attempts} attempts")]
    WindowFailed {
        /// The window that could not be fetched
        range: BlockRange,
        /// Number of attempts made, including the first
        attempts: u32,
        /// The last error seen
        #[source]
        source: SourceError,
    },

    /// A window failed with an error retrying cannot fix.
    #[error("Window {range} failed: {source}")]
    Fatal {
        /// The window that could not be fetched
        range: BlockRange,
        /// The non-transient error
        #[source]
        source: SourceError,
    },

    /// The store rejected a window.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid ingestion request, such as a target below the start block.
    #[error("Invalid ingestion range: {details}")]
    InvalidRange {
        /// Details about what was invalid
        details: String,
    },
}

impl IngestError {
    /// Create an `InvalidRange` error with details.
    pub fn invalid_range(details: impl Into<String>) -> Self {
        IngestError::InvalidRange {
            details: details.into(),
        }
    }
}
