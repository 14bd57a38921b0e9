// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Persisted holder balances at one block
//!
//! A [`BalanceSnapshot`] is what downstream reward weighting reads: every holder
//! with at least the configured minimum balance at a given block, plus the total
//! supply at that block.
//!
//! ```json
//! {
//!   "version": 1,
//!   "chain": "gnosis",
//!   "token": "0xce11e14225575945b8e6dc0d4f2dd4c570f79d9f",
//!   "block": 38000000,
//!   "generated_at": "2025-06-01T00:00:00Z",
//!   "total_supply": "1000000000000000000000",
//!   "balances": { "0x00000000000000000000000000000000000000aa": "600" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::constants::SNAPSHOT_FORMAT_VERSION;
use crate::errors::{QueryError, StoreError};
use crate::store::file::write_atomic;
use crate::types::event::decimal_u256;
use crate::Ledger;

/// Holder balances of one token on one chain as of `block`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub version: u32,
    pub chain: NamedChain,
    pub token: Address,
    pub block: BlockNumber,
    pub generated_at: DateTime<Utc>,
    /// Sum of every holder balance at `block`, including holders filtered out below
    #[serde(with = "decimal_u256")]
    pub total_supply: U256,
    #[serde(with = "decimal_balances")]
    pub balances: BTreeMap<Address, U256>,
}

impl BalanceSnapshot {
    /// Takes the balances of every holder with at least `min_balance` at `block`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BeyondBuiltRange`] if `block` is past the ledger.
    pub fn from_ledger(
        ledger: &Ledger,
        chain: NamedChain,
        token: Address,
        block: BlockNumber,
        min_balance: U256,
    ) -> Result<Self, QueryError> {
        let all = ledger.balances_as_of(block)?;
        let total_supply = all
            .values()
            .fold(U256::ZERO, |acc, balance| acc.saturating_add(*balance));
        let balances = all
            .into_iter()
            .filter(|(_, balance)| *balance >= min_balance)
            .collect();

        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            chain,
            token,
            block,
            generated_at: Utc::now(),
            total_supply,
            balances,
        })
    }

    /// Number of holders in the snapshot
    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    /// Writes the snapshot as pretty JSON, replacing `path` atomically
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`] on failure.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::serialization("Failed to encode balance snapshot", e))?;
        write_atomic(path, &json).await?;

        info!(
            path = %path.display(),
            chain = %self.chain,
            block = self.block,
            holders = self.holders(),
            "Saved balance snapshot"
        );
        Ok(())
    }

    /// Reads a snapshot written by [`write_json`](Self::write_json)
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file cannot be read
    /// - [`StoreError::Corrupted`] if it does not parse or has another format version
    pub async fn read_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io(&display, "Failed to read balance snapshot", e))?;

        let snapshot: Self = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupted(&display, 0, format!("unparsable snapshot: {e}")))?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::corrupted(
                display,
                0,
                format!(
                    "snapshot version {} is not supported (expected {SNAPSHOT_FORMAT_VERSION})",
                    snapshot.version
                ),
            ));
        }
        Ok(snapshot)
    }
}

/// Serde adapter for an address → amount map with decimal string amounts
mod decimal_balances {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use alloy_primitives::{Address, U256};
    use serde::de::Error;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(balances: &BTreeMap<Address, U256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(balances.len()))?;
        for (address, balance) in balances {
            map.serialize_entry(address, &balance.to_string())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<Address, U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(address, amount)| {
                let parsed = Address::from_str(&address)
                    .map_err(|e| D::Error::custom(format!("invalid holder '{address}': {e}")))?;
                let balance = U256::from_str(&amount).map_err(|e| {
                    D::Error::custom(format!("invalid balance '{amount}' for {address}: {e}"))
                })?;
                Ok((parsed, balance))
            })
            .collect()
    }
}
