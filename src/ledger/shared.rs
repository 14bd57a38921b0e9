// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Snapshot handle for concurrent readers and a single extending writer

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use alloy_primitives::BlockNumber;
use tracing::debug;

use super::{Ledger, LedgerBuilder};
use crate::errors::ReplayError;
use crate::TransferEvent;

/// A ledger shared between query tasks and the task that keeps it current
///
/// Readers call [`snapshot`](Self::snapshot) and query the returned `Arc<Ledger>`
/// without holding any lock. Extensions replay into a private copy and swap it in
/// only on success, so readers observe either the old or the new ledger, never a
/// half-applied one. Extensions are serialized against each other.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    current: Arc<RwLock<Arc<Ledger>>>,
    writer: Arc<Mutex<()>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(ledger))),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// The ledger as of the last successful extension
    pub fn snapshot(&self) -> Arc<Ledger> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Block the current snapshot is built through
    pub fn built_through(&self) -> BlockNumber {
        self.snapshot().built_through()
    }

    /// Replays `events` past the current snapshot and publishes the result
    ///
    /// On error the published snapshot is unchanged.
    ///
    /// # Errors
    ///
    /// Any [`ReplayError`] from [`LedgerBuilder::extend`].
    pub fn extend(
        &self,
        events: &[TransferEvent],
        through: BlockNumber,
    ) -> Result<Arc<Ledger>, ReplayError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let base = self.snapshot();
        let next = Arc::new(LedgerBuilder::extend(&base, events, through)?);
        self.publish(Arc::clone(&next));

        debug!(
            from = base.built_through(),
            through = next.built_through(),
            "Published extended ledger"
        );
        Ok(next)
    }

    /// Publishes a ledger built elsewhere, e.g. a full rebuild
    pub fn replace(&self, ledger: Ledger) -> Arc<Ledger> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(ledger);
        self.publish(Arc::clone(&next));
        next
    }

    fn publish(&self, ledger: Arc<Ledger>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = ledger;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BalanceQuery, MINT_BURN_SENTINEL};
    use alloy_primitives::{Address, TxHash, U256};

    const A: Address = Address::with_last_byte(0xaa);
    const B: Address = Address::with_last_byte(0xbb);

    fn event(block: u64, tx: u8, from: Address, to: Address, value: u64) -> TransferEvent {
        TransferEvent::new(block, 0, TxHash::with_last_byte(tx), from, to, U256::from(value))
    }

    fn shared() -> SharedLedger {
        let ledger = LedgerBuilder::new(100)
            .build(&[event(100, 1, MINT_BURN_SENTINEL, A, 1000)], 100)
            .unwrap();
        SharedLedger::new(ledger)
    }

    #[test]
    fn test_old_snapshot_survives_extension() {
        let shared = shared();
        let before = shared.snapshot();

        shared.extend(&[event(101, 2, A, B, 400)], 101).unwrap();

        assert_eq!(before.built_through(), 100);
        assert!(before.balance_as_of(A, 101).is_err());

        let after = shared.snapshot();
        assert_eq!(after.balance_as_of(A, 101).unwrap(), U256::from(600));
        assert_eq!(after.balance_as_of(A, 100).unwrap(), U256::from(1000));
    }

    #[test]
    fn test_failed_extension_keeps_published_ledger() {
        let shared = shared();

        let err = shared.extend(&[event(101, 2, A, B, 5000)], 101).unwrap_err();
        assert!(matches!(err, ReplayError::InsufficientBalance { .. }));
        assert_eq!(shared.built_through(), 100);
    }

    #[test]
    fn test_replace_publishes_new_ledger() {
        let shared = shared();
        let rebuilt = LedgerBuilder::new(100).build(&[], 150).unwrap();

        shared.replace(rebuilt);
        assert_eq!(shared.built_through(), 150);
        assert!(shared.snapshot().addresses_with_activity().is_empty());
    }

    #[test]
    fn test_readers_on_other_threads() {
        let shared = shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reader = shared.clone();
                std::thread::spawn(move || reader.snapshot().balance_as_of(A, 100).unwrap())
            })
            .collect();

        shared.extend(&[event(102, 2, A, B, 1)], 102).unwrap();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), U256::from(1000));
        }
    }
}
