// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Normalized ERC-20 transfer events
//!
//! A [`TransferEvent`] is the unit every other component works on: the normalizer
//! sorts and deduplicates them, the event stores persist them, and the ledger
//! builder replays them into balance timelines.
//!
//! Two keys matter:
//!
//! - [`EventKey`] `(tx_hash, log_index)` identifies an event. Re-fetching a block
//!   range yields events with the same identity, which is how duplicates are found.
//! - [`TransferEvent::order_key`] `(block_number, log_index)` is the replay order.

use std::fmt;

use alloy_primitives::{Address, BlockNumber, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::config::constants::MINT_BURN_SENTINEL;

/// Identity of a transfer event: the transaction that emitted it and its log index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx {} log {}", self.tx_hash, self.log_index)
    }
}

/// An ERC-20 `Transfer` event reduced to the fields the ledger needs
///
/// `from` equal to [`MINT_BURN_SENTINEL`] is a mint, `to` equal to it is a burn.
/// `value` is in base units, with no decimal scaling applied.
///
/// # Examples
///
/// ```
/// use alloy_primitives::{address, b256, U256};
/// use holdscan::TransferEvent;
///
/// let mint = TransferEvent::new(
///     100,
///     0,
///     b256!("0000000000000000000000000000000000000000000000000000000000000001"),
///     holdscan::MINT_BURN_SENTINEL,
///     address!("00000000000000000000000000000000000000aa"),
///     U256::from(1000),
/// );
/// assert!(mint.is_mint());
/// assert_eq!(mint.order_key(), (100, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferEvent {
    pub block_number: BlockNumber,
    pub log_index: u64,
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    #[serde(with = "decimal_u256")]
    pub value: U256,
}

impl TransferEvent {
    pub fn new(
        block_number: BlockNumber,
        log_index: u64,
        tx_hash: TxHash,
        from: Address,
        to: Address,
        value: U256,
    ) -> Self {
        Self {
            block_number,
            log_index,
            tx_hash,
            from,
            to,
            value,
        }
    }

    /// Identity used for deduplication
    pub fn key(&self) -> EventKey {
        EventKey {
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }

    /// Total order used for replay
    pub fn order_key(&self) -> (BlockNumber, u64) {
        (self.block_number, self.log_index)
    }

    pub fn is_mint(&self) -> bool {
        self.from == MINT_BURN_SENTINEL
    }

    pub fn is_burn(&self) -> bool {
        self.to == MINT_BURN_SENTINEL
    }

    /// `from == to`: kept for provenance, moves no balance
    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at block {}: {} -> {} value {}",
            self.key(),
            self.block_number,
            self.from,
            self.to,
            self.value
        )
    }
}

/// Serde adapter storing `U256` as a base-10 string
///
/// Decimal strings keep persisted rows readable and lossless; JSON numbers cannot
/// carry 256-bit integers.
pub(crate) mod decimal_u256 {
    use std::str::FromStr;

    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(&raw).map_err(|e| D::Error::custom(format!("invalid amount '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample() -> TransferEvent {
        TransferEvent::new(
            105,
            3,
            TxHash::with_last_byte(2),
            address!("00000000000000000000000000000000000000aa"),
            address!("00000000000000000000000000000000000000bb"),
            U256::from(400),
        )
    }

    #[test]
    fn test_keys() {
        let event = sample();
        assert_eq!(event.order_key(), (105, 3));
        assert_eq!(event.key().log_index, 3);
        assert_eq!(event.key().tx_hash, event.tx_hash);
    }

    #[test]
    fn test_mint_burn_and_self_transfer() {
        let mut event = sample();
        assert!(!event.is_mint());
        assert!(!event.is_burn());
        assert!(!event.is_self_transfer());

        event.from = MINT_BURN_SENTINEL;
        assert!(event.is_mint());

        event.to = MINT_BURN_SENTINEL;
        assert!(event.is_burn());
        assert!(event.is_self_transfer());
    }

    #[test]
    fn test_value_serializes_as_decimal_string() {
        let mut event = sample();
        event.value = U256::MAX;

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["value"], serde_json::Value::String(U256::MAX.to_string()));
        assert_eq!(json["block_number"], 105);
        assert_eq!(json["log_index"], 3);

        let decoded: TransferEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_value_rejects_garbage() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["value"] = serde_json::Value::String("four hundred".to_string());
        assert!(serde_json::from_value::<TransferEvent>(json).is_err());
    }
}
