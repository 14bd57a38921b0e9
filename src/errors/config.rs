// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for configuration lookups.

use alloy_chains::NamedChain;

/// Errors from resolving per-chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No settings exist for the chain.
    #[error("Chain {chain} is not configured")]
    ChainNotConfigured {
        /// The chain that was requested
        chain: NamedChain,
    },

    /// The chain is configured but has no RPC endpoint.
    #[error("Missing RPC endpoint for chain {chain}")]
    MissingEndpoint {
        /// The chain without an endpoint
        chain: NamedChain,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration value for {field}: {details}")]
    InvalidValue {
        /// Name of the field
        field: String,
        /// Why it was rejected
        details: String,
    },
}

impl ConfigError {
    /// Create an `InvalidValue` error.
    pub fn invalid_value(field: impl Into<String>, details: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            details: details.into(),
        }
    }
}
