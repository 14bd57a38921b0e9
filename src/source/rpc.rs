// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON-RPC event source built on an alloy [`Provider`]

use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{trace, Instrument};
use url::Url;

use super::{ChainEventSource, Transfer};
use crate::config::constants::DEFAULT_RPC_TIMEOUT;
use crate::errors::SourceError;
use crate::{spans, BlockRange, MaxBlockRange, TransferEvent};

/// Fetches `Transfer` logs with `eth_getLogs`
///
/// A requested range is split into chunks of at most `max_block_range` blocks, one
/// `eth_getLogs` call each, and every call is bounded by `timeout`. Logs without a
/// block number, log index or transaction hash, or flagged as removed, fail the
/// whole fetch.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{ChainEventSource, MaxBlockRange, RpcEventSource};
///
/// let source = RpcEventSource::connect_http(rpc_url, NamedChain::Gnosis, token)
///     .with_max_block_range(MaxBlockRange::new(5_000))
///     .with_timeout(Duration::from_secs(60));
///
/// let events = source.fetch_logs(range).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RpcEventSource<P> {
    provider: P,
    chain: NamedChain,
    token: Address,
    max_block_range: MaxBlockRange,
    timeout: Duration,
    rate_limit_delay: Option<Duration>,
}

impl RpcEventSource<RootProvider> {
    /// Source backed by a plain HTTP provider
    pub fn connect_http(url: Url, chain: NamedChain, token: Address) -> Self {
        Self::new(RootProvider::new_http(url), chain, token)
    }
}

impl<P: Provider> RpcEventSource<P> {
    pub fn new(provider: P, chain: NamedChain, token: Address) -> Self {
        Self {
            provider,
            chain,
            token,
            max_block_range: MaxBlockRange::DEFAULT,
            timeout: DEFAULT_RPC_TIMEOUT,
            rate_limit_delay: None,
        }
    }

    pub fn with_max_block_range(mut self, max_block_range: MaxBlockRange) -> Self {
        self.max_block_range = max_block_range;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause between consecutive `eth_getLogs` calls of one fetch
    pub fn with_rate_limit_delay(mut self, delay: Option<Duration>) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Latest block number reported by the node
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::HeadUnavailable`] if the call fails or times out.
    pub async fn latest_block(&self) -> Result<BlockNumber, SourceError> {
        match tokio::time::timeout(self.timeout, self.provider.get_block_number()).await {
            Ok(Ok(block)) => Ok(block),
            Ok(Err(e)) => Err(SourceError::head_unavailable(e)),
            Err(elapsed) => Err(SourceError::head_unavailable(elapsed)),
        }
    }

    async fn get_logs(&self, chunk: BlockRange) -> Result<Vec<Log>, SourceError> {
        let filter = transfer_filter(self.token, chunk);
        trace!(?filter, "Fetching logs");

        match tokio::time::timeout(self.timeout, self.provider.get_logs(&filter)).await {
            Ok(Ok(logs)) => {
                trace!(logs_count = logs.len(), "Fetched logs");
                Ok(logs)
            }
            Ok(Err(e)) => Err(SourceError::rpc_failed(chunk, e)),
            Err(_) => Err(SourceError::Timeout {
                range: chunk,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl<P: Provider> ChainEventSource for RpcEventSource<P> {
    async fn fetch_logs(&self, range: BlockRange) -> Result<Vec<TransferEvent>, SourceError> {
        let mut events = Vec::new();
        let mut chunks = self.max_block_range.chunk_range(range).peekable();

        while let Some(chunk) = chunks.next() {
            let logs = self
                .get_logs(chunk)
                .instrument(spans::fetch_transfer_logs(self.token, chunk))
                .await?;
            for log in &logs {
                events.push(transfer_from_log(chunk, log)?);
            }

            if let Some(delay) = self.rate_limit_delay {
                if chunks.peek().is_some() {
                    trace!(chain = %self.chain, ?delay, "Applying rate limit delay");
                    sleep(delay).await;
                }
            }
        }

        Ok(events)
    }

    fn chain(&self) -> NamedChain {
        self.chain
    }

    fn token(&self) -> Address {
        self.token
    }
}

/// `eth_getLogs` filter for the token's `Transfer` logs in `chunk`
pub(crate) fn transfer_filter(token: Address, chunk: BlockRange) -> Filter {
    Filter::new()
        .address(token)
        .event_signature(Transfer::SIGNATURE_HASH)
        .from_block(chunk.start())
        .to_block(chunk.end())
}

/// Converts one RPC log into a [`TransferEvent`]
pub(crate) fn transfer_from_log(chunk: BlockRange, log: &Log) -> Result<TransferEvent, SourceError> {
    if log.removed {
        return Err(SourceError::removed_log(
            chunk,
            format!(
                "tx {:?} log {:?} at block {:?}",
                log.transaction_hash, log.log_index, log.block_number
            ),
        ));
    }

    let block_number = log
        .block_number
        .ok_or_else(|| SourceError::incomplete_log(chunk, "missing block number"))?;
    let log_index = log.log_index.ok_or_else(|| {
        SourceError::incomplete_log(chunk, format!("missing log index at block {block_number}"))
    })?;
    let tx_hash = log.transaction_hash.ok_or_else(|| {
        SourceError::incomplete_log(
            chunk,
            format!("missing transaction hash at block {block_number} log {log_index}"),
        )
    })?;

    let transfer = Transfer::decode_log(&log.inner).map_err(|e| {
        SourceError::decode_failed(format!("tx {tx_hash} log {log_index}: {e}"))
    })?;

    Ok(TransferEvent::new(
        block_number,
        log_index,
        tx_hash,
        transfer.data.from,
        transfer.data.to,
        transfer.data.value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{LogData, TxHash, B256, U256};

    const TOKEN: Address = Address::with_last_byte(0x70);

    fn rpc_log(data: LogData) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: TOKEN,
                data,
            },
            block_hash: Some(B256::with_last_byte(0xbb)),
            block_number: Some(105),
            block_timestamp: None,
            transaction_hash: Some(TxHash::with_last_byte(2)),
            transaction_index: Some(0),
            log_index: Some(7),
            removed: false,
        }
    }

    fn transfer_log() -> Log {
        let transfer = Transfer {
            from: Address::with_last_byte(0xaa),
            to: Address::with_last_byte(0xbb),
            value: U256::from(400),
        };
        rpc_log(transfer.encode_log_data())
    }

    fn chunk() -> BlockRange {
        BlockRange::new(100, 199).unwrap()
    }

    #[test]
    fn test_decodes_transfer_log() {
        let event = transfer_from_log(chunk(), &transfer_log()).unwrap();
        assert_eq!(event.block_number, 105);
        assert_eq!(event.log_index, 7);
        assert_eq!(event.tx_hash, TxHash::with_last_byte(2));
        assert_eq!(event.from, Address::with_last_byte(0xaa));
        assert_eq!(event.to, Address::with_last_byte(0xbb));
        assert_eq!(event.value, U256::from(400));
    }

    #[test]
    fn test_rejects_incomplete_logs() {
        let mut log = transfer_log();
        log.log_index = None;
        assert!(matches!(
            transfer_from_log(chunk(), &log),
            Err(SourceError::IncompleteLog { .. })
        ));

        let mut log = transfer_log();
        log.transaction_hash = None;
        let err = transfer_from_log(chunk(), &log).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_removed_log_is_transient() {
        let mut log = transfer_log();
        log.removed = true;
        let err = transfer_from_log(chunk(), &log).unwrap_err();
        assert!(matches!(err, SourceError::RemovedLog { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_rejects_foreign_event() {
        let log = rpc_log(LogData::new_unchecked(vec![B256::with_last_byte(1)], Default::default()));
        assert!(matches!(
            transfer_from_log(chunk(), &log),
            Err(SourceError::DecodeFailed { .. })
        ));
    }

    #[test]
    fn test_filter_bounds() {
        let filter = transfer_filter(TOKEN, chunk());
        assert_eq!(filter.get_from_block(), Some(100));
        assert_eq!(filter.get_to_block(), Some(199));
    }
}
