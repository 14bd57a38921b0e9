//! Well-known addresses and constants
//!
//! This module centralizes magic constants used throughout the holdscan crate.

use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};

/// Address that stands for token creation (as `from`) and destruction (as `to`)
///
/// Debits from it are never applied and its own balance is never exposed through
/// queries.
pub const MINT_BURN_SENTINEL: Address = Address::ZERO;

/// Format version of the event store metadata sidecar
pub const STORE_FORMAT_VERSION: u32 = 2;

/// Format version of written balance snapshots
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Timeout for a single `eth_getLogs` call
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocks per ingestion window (each window may span several RPC calls)
pub const DEFAULT_WINDOW_BLOCKS: u64 = 10_000;

/// Ingestion windows fetched concurrently
pub const DEFAULT_MAX_CONCURRENT_WINDOWS: usize = 4;

/// Deployment blocks of the OLAS token, the first token this crate indexed
///
/// Used as the default ingestion start for the matching chains.
pub mod olas {
    use super::*;

    pub const ETHEREUM_DEPLOYMENT_BLOCK: BlockNumber = 15_000_000;
    pub const GNOSIS_DEPLOYMENT_BLOCK: BlockNumber = 30_254_468;
    pub const ARBITRUM_DEPLOYMENT_BLOCK: BlockNumber = 173_139_043;
    pub const POLYGON_DEPLOYMENT_BLOCK: BlockNumber = 50_976_704;
    pub const BASE_DEPLOYMENT_BLOCK: BlockNumber = 12_393_538;
    pub const OPTIMISM_DEPLOYMENT_BLOCK: BlockNumber = 117_443_138;

    /// Deployment block for `chain`, if the token is deployed there
    pub fn deployment_block(chain: NamedChain) -> Option<BlockNumber> {
        match chain {
            NamedChain::Mainnet => Some(ETHEREUM_DEPLOYMENT_BLOCK),
            NamedChain::Gnosis => Some(GNOSIS_DEPLOYMENT_BLOCK),
            NamedChain::Arbitrum => Some(ARBITRUM_DEPLOYMENT_BLOCK),
            NamedChain::Polygon => Some(POLYGON_DEPLOYMENT_BLOCK),
            NamedChain::Base => Some(BASE_DEPLOYMENT_BLOCK),
            NamedChain::Optimism => Some(OPTIMISM_DEPLOYMENT_BLOCK),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_zero_address() {
        assert_eq!(MINT_BURN_SENTINEL, Address::ZERO);
    }

    #[test]
    fn test_olas_deployment_blocks() {
        assert_eq!(
            olas::deployment_block(NamedChain::Mainnet),
            Some(15_000_000)
        );
        assert_eq!(
            olas::deployment_block(NamedChain::Base),
            Some(olas::BASE_DEPLOYMENT_BLOCK)
        );
        assert_eq!(olas::deployment_block(NamedChain::Sonic), None);
    }
}
