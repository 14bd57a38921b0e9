// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for holdscan integration tests
//!
//! Provides event builders and a scripted [`ChainEventSource`] so ingestion and the
//! pipeline can be tested without a node.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber, TxHash, U256};
use async_trait::async_trait;
use holdscan::{BlockRange, ChainEventSource, SourceError, TransferEvent, MINT_BURN_SENTINEL};

pub const TOKEN: Address = Address::with_last_byte(0x70);
pub const ALICE: Address = Address::with_last_byte(0xaa);
pub const BOB: Address = Address::with_last_byte(0xbb);
pub const CAROL: Address = Address::with_last_byte(0xcc);

/// Routes holdscan logs to the test writer; set `RUST_LOG=holdscan=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transaction hash unique to a (block, log index) pair
pub fn tx(block: BlockNumber, log_index: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block.to_be_bytes());
    bytes[24..].copy_from_slice(&log_index.to_be_bytes());
    TxHash::from(bytes)
}

pub fn transfer(
    block: BlockNumber,
    log_index: u64,
    from: Address,
    to: Address,
    value: u64,
) -> TransferEvent {
    TransferEvent::new(block, log_index, tx(block, log_index), from, to, U256::from(value))
}

pub fn mint(block: BlockNumber, log_index: u64, to: Address, value: u64) -> TransferEvent {
    transfer(block, log_index, MINT_BURN_SENTINEL, to, value)
}

pub fn burn(block: BlockNumber, log_index: u64, from: Address, value: u64) -> TransferEvent {
    transfer(block, log_index, from, MINT_BURN_SENTINEL, value)
}

/// `(100,0,t1,MINT→A,1000)`, `(105,0,t2,A→B,400)`
pub fn scenario_events() -> Vec<TransferEvent> {
    vec![
        TransferEvent::new(
            100,
            0,
            TxHash::with_last_byte(1),
            MINT_BURN_SENTINEL,
            ALICE,
            U256::from(1000),
        ),
        TransferEvent::new(105, 0, TxHash::with_last_byte(2), ALICE, BOB, U256::from(400)),
    ]
}

/// Event source serving a fixed list of events
///
/// Every fetch returns the scripted events inside the requested range, in the order
/// they were scripted (not necessarily canonical). The first `failures` fetches fail
/// with a timeout.
///
/// # Example
///
/// ```rust,ignore
/// let source = MockEventSource::new(NamedChain::Gnosis, TOKEN)
///     .with_events(scenario_events())
///     .with_failures(2);
/// ```
pub struct MockEventSource {
    chain: NamedChain,
    token: Address,
    events: Vec<TransferEvent>,
    failures: AtomicU32,
    requested: Mutex<Vec<BlockRange>>,
}

impl MockEventSource {
    pub fn new(chain: NamedChain, token: Address) -> Self {
        Self {
            chain,
            token,
            events: Vec::new(),
            failures: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_events(mut self, events: Vec<TransferEvent>) -> Self {
        self.events = events;
        self
    }

    /// Fail the next `failures` fetches with a transient error
    pub fn with_failures(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    /// Ranges fetched so far, successful or not, in call order
    pub fn requested(&self) -> Vec<BlockRange> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainEventSource for MockEventSource {
    async fn fetch_logs(&self, range: BlockRange) -> Result<Vec<TransferEvent>, SourceError> {
        self.requested.lock().unwrap().push(range);

        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SourceError::Timeout {
                range,
                timeout: Duration::from_secs(30),
            });
        }

        Ok(self
            .events
            .iter()
            .filter(|event| range.contains(event.block_number))
            .cloned()
            .collect())
    }

    fn chain(&self) -> NamedChain {
        self.chain
    }

    fn token(&self) -> Address {
        self.token
    }
}
