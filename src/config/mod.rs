// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for holdscan runs
//!
//! A [`HoldscanConfig`] holds the RPC limits shared by every chain, the ingestion
//! and retry policy, where files live, and one [`ChainSettings`] per chain. Chains
//! differ only in data: token address, deployment block, endpoint and optional
//! RPC overrides.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use holdscan::HoldscanConfig;
//!
//! // No chains configured; RPC and ingestion limits at their defaults
//! let config = HoldscanConfig::default();
//! assert!(config.configured_chains().is_empty());
//! ```
//!
//! # Example: OLAS on two chains
//!
//! ```rust
//! use alloy_chains::NamedChain;
//! use alloy_primitives::address;
//! use holdscan::{ChainAvailability, ChainSettings, HoldscanConfigBuilder};
//!
//! let olas = address!("0001a500a6b18995b03f44bb040a5ffc28e45cb0");
//! let config = HoldscanConfigBuilder::new()
//!     .data_dir("data")
//!     .chain(
//!         NamedChain::Mainnet,
//!         ChainSettings::olas(NamedChain::Mainnet, olas)
//!             .unwrap()
//!             .with_rpc_url("https://eth.example.org".parse().unwrap()),
//!     )
//!     .chain(NamedChain::Gnosis, ChainSettings::olas(NamedChain::Gnosis, olas).unwrap())
//!     .chain_max_blocks(NamedChain::Gnosis, 5_000)
//!     .build()
//!     .unwrap();
//!
//! assert!(matches!(
//!     config.availability(NamedChain::Gnosis),
//!     Ok(ChainAvailability::MissingEndpoint)
//! ));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber, U256};
use url::Url;

use crate::errors::ConfigError;
use crate::MaxBlockRange;

pub mod constants;

use constants::{
    olas, DEFAULT_MAX_CONCURRENT_WINDOWS, DEFAULT_RPC_TIMEOUT, DEFAULT_WINDOW_BLOCKS,
};

/// Default maximum number of retry attempts.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay for exponential backoff (100ms).
const DEFAULT_BASE_DELAY_MS: u64 = 100;
/// Default maximum delay between retries (30 seconds).
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry policy for fetching one ingestion window
///
/// The delay before retry `n` (counting from zero) is
/// `min(base_delay * 2^n, max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial request).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay to wait before retry number `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 2u64.saturating_pow(attempt);
        let delay_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(u128::from(multiplier));
        let capped_ms = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(u64::try_from(capped_ms).unwrap_or(u64::MAX))
    }
}

/// What holdscan needs to know about one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    /// ERC-20 token contract
    pub token: Address,
    /// First block ingested and replayed
    pub deployment_block: BlockNumber,
    /// JSON-RPC endpoint; a chain without one is skipped
    pub rpc_url: Option<Url>,
    /// Override max block range for this chain
    pub max_block_range: Option<MaxBlockRange>,
    /// Override rate limit delay for this chain
    pub rate_limit_delay: Option<Duration>,
    /// Override RPC timeout for this chain
    pub rpc_timeout: Option<Duration>,
}

impl ChainSettings {
    pub fn new(token: Address, deployment_block: BlockNumber) -> Self {
        Self {
            token,
            deployment_block,
            rpc_url: None,
            max_block_range: None,
            rate_limit_delay: None,
            rpc_timeout: None,
        }
    }

    /// Settings starting at the OLAS deployment block on `chain`
    ///
    /// Returns `None` for chains OLAS is not deployed on.
    pub fn olas(chain: NamedChain, token: Address) -> Option<Self> {
        olas::deployment_block(chain).map(|block| Self::new(token, block))
    }

    pub fn with_rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }
}

/// Whether a configured chain can be ingested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAvailability {
    /// The chain has an endpoint to fetch from
    Available { rpc_url: Url },
    /// The chain is configured but has no endpoint
    MissingEndpoint,
}

/// Configuration for holdscan operations
///
/// Use [`HoldscanConfigBuilder`] for a fluent API to construct instances.
#[derive(Debug, Clone)]
pub struct HoldscanConfig {
    /// Maximum number of blocks to query in a single RPC call
    pub max_block_range: MaxBlockRange,

    /// Blocks per ingestion window; each window is committed as a unit
    pub window_blocks: MaxBlockRange,

    /// Ingestion windows fetched concurrently
    pub max_concurrent_windows: usize,

    /// Delay between RPC requests to avoid rate limiting
    pub rate_limit_delay: Option<Duration>,

    /// Timeout for RPC requests
    pub rpc_timeout: Duration,

    pub retry: RetryConfig,

    /// Directory holding event logs and balance snapshots
    pub data_dir: PathBuf,

    /// Holders below this balance are left out of snapshots
    pub min_balance: U256,

    /// Per-chain settings
    pub chains: HashMap<NamedChain, ChainSettings>,
}

impl Default for HoldscanConfig {
    fn default() -> Self {
        Self {
            max_block_range: MaxBlockRange::DEFAULT,
            window_blocks: MaxBlockRange::new(DEFAULT_WINDOW_BLOCKS),
            max_concurrent_windows: DEFAULT_MAX_CONCURRENT_WINDOWS,
            rate_limit_delay: None,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            retry: RetryConfig::default(),
            data_dir: PathBuf::from("data"),
            min_balance: U256::from(1),
            chains: HashMap::new(),
        }
    }
}

impl HoldscanConfig {
    /// Settings for `chain`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChainNotConfigured`] if the chain has no settings.
    pub fn chain(&self, chain: NamedChain) -> Result<&ChainSettings, ConfigError> {
        self.chains
            .get(&chain)
            .ok_or(ConfigError::ChainNotConfigured { chain })
    }

    /// Configured chains, ordered by chain id
    pub fn configured_chains(&self) -> Vec<NamedChain> {
        let mut chains: Vec<NamedChain> = self.chains.keys().copied().collect();
        chains.sort_by_key(|chain| *chain as u64);
        chains
    }

    /// Whether `chain` can be ingested right now
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChainNotConfigured`] if the chain has no settings.
    pub fn availability(&self, chain: NamedChain) -> Result<ChainAvailability, ConfigError> {
        Ok(match &self.chain(chain)?.rpc_url {
            Some(url) => ChainAvailability::Available {
                rpc_url: url.clone(),
            },
            None => ChainAvailability::MissingEndpoint,
        })
    }

    /// RPC endpoint for `chain`
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ChainNotConfigured`] if the chain has no settings
    /// - [`ConfigError::MissingEndpoint`] if it has no endpoint
    pub fn rpc_url(&self, chain: NamedChain) -> Result<&Url, ConfigError> {
        self.chain(chain)?
            .rpc_url
            .as_ref()
            .ok_or(ConfigError::MissingEndpoint { chain })
    }

    /// Get effective max block range for a specific chain
    ///
    /// Returns chain-specific override if set, otherwise returns global default.
    pub fn get_max_block_range(&self, chain: NamedChain) -> MaxBlockRange {
        self.chains
            .get(&chain)
            .and_then(|c| c.max_block_range)
            .unwrap_or(self.max_block_range)
    }

    /// Get effective rate limit delay for a specific chain
    pub fn get_rate_limit_delay(&self, chain: NamedChain) -> Option<Duration> {
        self.chains
            .get(&chain)
            .and_then(|c| c.rate_limit_delay)
            .or(self.rate_limit_delay)
    }

    /// Get effective RPC timeout for a specific chain
    pub fn get_rpc_timeout(&self, chain: NamedChain) -> Duration {
        self.chains
            .get(&chain)
            .and_then(|c| c.rpc_timeout)
            .unwrap_or(self.rpc_timeout)
    }

    /// Event log for `chain`: `{data_dir}/events_{chain}.jsonl`
    pub fn events_path(&self, chain: NamedChain) -> PathBuf {
        chain_file(&self.data_dir, "events", chain, "jsonl")
    }

    /// Balance snapshot for `chain`: `{data_dir}/balances_{chain}.json`
    pub fn snapshot_path(&self, chain: NamedChain) -> PathBuf {
        chain_file(&self.data_dir, "balances", chain, "json")
    }

    /// Checks values that would make ingestion impossible
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_windows == 0 {
            return Err(ConfigError::invalid_value(
                "max_concurrent_windows",
                "must be at least 1",
            ));
        }
        if self.rpc_timeout.is_zero() {
            return Err(ConfigError::invalid_value("rpc_timeout", "must be non-zero"));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::invalid_value(
                "retry.base_delay",
                format!(
                    "{:?} exceeds max_delay {:?}",
                    self.retry.base_delay, self.retry.max_delay
                ),
            ));
        }
        for (chain, settings) in &self.chains {
            if settings.rpc_timeout.is_some_and(|timeout| timeout.is_zero()) {
                return Err(ConfigError::invalid_value(
                    format!("chains.{chain}.rpc_timeout"),
                    "must be non-zero",
                ));
            }
        }
        Ok(())
    }
}

fn chain_file(dir: &Path, prefix: &str, chain: NamedChain, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{chain}.{extension}"))
}

/// Builder for [`HoldscanConfig`]
///
/// # Example
///
/// ```rust
/// use alloy_chains::NamedChain;
/// use alloy_primitives::Address;
/// use holdscan::{ChainSettings, HoldscanConfigBuilder};
/// use std::time::Duration;
///
/// let config = HoldscanConfigBuilder::new()
///     .max_block_range(1000)
///     .max_concurrent_windows(8)
///     .chain(NamedChain::Base, ChainSettings::new(Address::ZERO, 12_393_538))
///     .chain_rate_limit(NamedChain::Base, Duration::from_millis(250))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.get_rate_limit_delay(NamedChain::Base), Some(Duration::from_millis(250)));
/// ```
#[derive(Debug, Default)]
pub struct HoldscanConfigBuilder {
    config: HoldscanConfig,
}

impl HoldscanConfigBuilder {
    /// Create a new builder with default limits and no chains
    pub fn new() -> Self {
        Self::default()
    }

    /// Set global max block range per RPC call
    pub fn max_block_range(mut self, max: u64) -> Self {
        self.config.max_block_range = MaxBlockRange::new(max);
        self
    }

    /// Set the number of blocks per ingestion window
    pub fn window_blocks(mut self, blocks: u64) -> Self {
        self.config.window_blocks = MaxBlockRange::new(blocks);
        self
    }

    pub fn max_concurrent_windows(mut self, windows: usize) -> Self {
        self.config.max_concurrent_windows = windows;
        self
    }

    /// Set global rate limit delay
    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.config.rate_limit_delay = Some(delay);
        self
    }

    /// Set global RPC timeout
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpc_timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Minimum balance for a holder to appear in snapshots
    pub fn min_balance(mut self, min_balance: U256) -> Self {
        self.config.min_balance = min_balance;
        self
    }

    /// Add or replace the settings for a chain
    pub fn chain(mut self, chain: NamedChain, settings: ChainSettings) -> Self {
        self.config.chains.insert(chain, settings);
        self
    }

    /// Convenience: set the RPC endpoint of an already added chain
    pub fn chain_rpc_url(mut self, chain: NamedChain, url: Url) -> Self {
        if let Some(settings) = self.config.chains.get_mut(&chain) {
            settings.rpc_url = Some(url);
        }
        self
    }

    /// Convenience: set rate limit delay for an already added chain
    pub fn chain_rate_limit(mut self, chain: NamedChain, delay: Duration) -> Self {
        if let Some(settings) = self.config.chains.get_mut(&chain) {
            settings.rate_limit_delay = Some(delay);
        }
        self
    }

    /// Convenience: set max block range for an already added chain
    pub fn chain_max_blocks(mut self, chain: NamedChain, max: u64) -> Self {
        if let Some(settings) = self.config.chains.get_mut(&chain) {
            settings.max_block_range = Some(MaxBlockRange::new(max));
        }
        self
    }

    /// Convenience: set RPC timeout for an already added chain
    pub fn chain_timeout(mut self, chain: NamedChain, timeout: Duration) -> Self {
        if let Some(settings) = self.config.chains.get_mut(&chain) {
            settings.rpc_timeout = Some(timeout);
        }
        self
    }

    /// Build and validate the final configuration
    ///
    /// # Errors
    ///
    /// Any error from [`HoldscanConfig::validate`].
    pub fn build(self) -> Result<HoldscanConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
