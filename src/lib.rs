// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time ERC-20 balance history for EVM chains
//!
//! holdscan turns a token's `Transfer` logs into per-address balance timelines
//! that answer "what did this address hold at block N" exactly, for every block
//! since deployment.
//!
//! - [`normalize`] sorts transfer events into canonical `(block, log_index)` order
//!   and drops exact duplicates
//! - an [`EventStore`] ([`FileEventStore`], [`MemoryEventStore`]) persists them
//!   append-only and remembers how far ingestion got
//! - the [`Ingestor`] fills the store from a [`ChainEventSource`] window by window
//! - the [`LedgerBuilder`] replays the stored sequence into a [`Ledger`]
//! - [`BalanceQuery`] answers as-of-block questions on a built ledger
//! - the [`LedgerPipeline`] runs all of the above per configured chain and writes a
//!   [`BalanceSnapshot`]
//!
//! # Example
//!
//! ```rust
//! use alloy_primitives::{Address, TxHash, U256};
//! use holdscan::{BalanceQuery, LedgerBuilder, TransferEvent, MINT_BURN_SENTINEL};
//!
//! let alice = Address::with_last_byte(0xaa);
//! let bob = Address::with_last_byte(0xbb);
//! let events = holdscan::normalize(vec![
//!     TransferEvent::new(105, 0, TxHash::with_last_byte(2), alice, bob, U256::from(400)),
//!     TransferEvent::new(100, 0, TxHash::with_last_byte(1), MINT_BURN_SENTINEL, alice, U256::from(1000)),
//! ])
//! .unwrap();
//!
//! let ledger = LedgerBuilder::new(100).build(&events, 110).unwrap();
//! assert_eq!(ledger.balance_as_of(alice, 104).unwrap(), U256::from(1000));
//! assert_eq!(ledger.balance_as_of(alice, 105).unwrap(), U256::from(600));
//! assert_eq!(ledger.balance_as_of(bob, 104).unwrap(), U256::ZERO);
//! ```

pub mod config;
pub mod errors;
mod ingest;
mod ledger;
mod normalize;
mod pipeline;
mod snapshot;
mod source;
mod spans;
mod store;
pub mod types;

pub use config::constants::MINT_BURN_SENTINEL;
pub use config::{
    ChainAvailability, ChainSettings, HoldscanConfig, HoldscanConfigBuilder, RetryConfig,
};
pub use errors::{
    ConfigError, HoldscanError, IngestError, NormalizationError, QueryError, ReplayError,
    SourceError, StoreError,
};
pub use ingest::{IngestSummary, Ingestor};
pub use ledger::{BalanceQuery, Ledger, LedgerBuilder, SharedLedger};
pub use normalize::{normalize, verify_canonical};
pub use pipeline::{ChainRun, LedgerPipeline};
pub use snapshot::BalanceSnapshot;
pub use source::{ChainEventSource, RpcEventSource, Transfer};
pub use store::{EventStore, FileEventStore, MemoryEventStore, StoreKey};
pub use types::event::{EventKey, TransferEvent};
pub use types::range::{BlockRange, ChunkIterator, MaxBlockRange};
pub use types::timeline::{BalanceTimeline, Checkpoint};
