// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-chain glue: ingest, replay, publish, snapshot
//!
//! One [`LedgerPipeline::run_chain`] call brings a chain's event log up to a target
//! block, builds (or extends) its ledger, publishes it as a [`SharedLedger`] and
//! writes the balance snapshot next to the event log.
//!
//! ```rust,ignore
//! use holdscan::{ChainRun, LedgerPipeline};
//!
//! let pipeline = LedgerPipeline::new(config)?;
//! for (chain, run) in pipeline.run_all().await {
//!     match run? {
//!         ChainRun::Built { snapshot, .. } => println!("{chain}: {} holders", snapshot.holders()),
//!         ChainRun::Skipped { reason, .. } => println!("{chain}: skipped, {reason}"),
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use alloy_chains::NamedChain;
use alloy_primitives::BlockNumber;
use tracing::{debug, info, warn, Instrument};
use url::Url;

use crate::config::{ChainAvailability, ChainSettings, HoldscanConfig};
use crate::errors::{ConfigError, HoldscanError};
use crate::ingest::{IngestSummary, Ingestor};
use crate::snapshot::BalanceSnapshot;
use crate::{
    spans, ChainEventSource, EventStore, FileEventStore, Ledger, LedgerBuilder, RpcEventSource,
    SharedLedger, StoreKey,
};

/// Result of running the pipeline for one chain
#[derive(Debug, Clone)]
pub enum ChainRun {
    /// The ledger was brought to `snapshot.block` and published
    Built {
        chain: NamedChain,
        ingest: IngestSummary,
        ledger: Arc<Ledger>,
        snapshot: BalanceSnapshot,
    },
    /// The chain was configured but could not be run
    Skipped { chain: NamedChain, reason: String },
}

impl ChainRun {
    pub fn chain(&self) -> NamedChain {
        match self {
            ChainRun::Built { chain, .. } | ChainRun::Skipped { chain, .. } => *chain,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, ChainRun::Built { .. })
    }
}

/// Runs ingestion and replay for every configured chain
///
/// Ledgers are kept between runs: a later run on the same chain with a higher
/// target replays only the new blocks on top of the published ledger.
#[derive(Debug)]
pub struct LedgerPipeline {
    config: HoldscanConfig,
    ledgers: RwLock<HashMap<NamedChain, SharedLedger>>,
}

impl LedgerPipeline {
    /// # Errors
    ///
    /// Any error from [`HoldscanConfig::validate`].
    pub fn new(config: HoldscanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ledgers: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &HoldscanConfig {
        &self.config
    }

    /// Published ledger of `chain`, if a run has built one
    pub fn ledger(&self, chain: NamedChain) -> Option<SharedLedger> {
        self.ledgers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chain)
            .cloned()
    }

    /// Runs every configured chain up to its latest block, in chain id order
    ///
    /// A failing chain does not stop the others.
    pub async fn run_all(&self) -> Vec<(NamedChain, Result<ChainRun, HoldscanError>)> {
        let mut runs = Vec::new();
        for chain in self.config.configured_chains() {
            let run = self.run_chain(chain, None).await;
            if let Err(e) = &run {
                warn!(chain = %chain, error = %e, "Chain run failed");
            }
            runs.push((chain, run));
        }
        runs
    }

    /// Runs `chain` over JSON-RPC up to `target_block`, or the chain head when `None`
    ///
    /// A chain without an endpoint is skipped rather than failed.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ChainNotConfigured`] if `chain` has no settings
    /// - [`SourceError::HeadUnavailable`](crate::SourceError::HeadUnavailable) if the
    ///   head block is needed and cannot be read
    /// - any error from [`run_chain_with`](Self::run_chain_with)
    pub async fn run_chain(
        &self,
        chain: NamedChain,
        target_block: Option<BlockNumber>,
    ) -> Result<ChainRun, HoldscanError> {
        let settings = self.config.chain(chain)?;
        let rpc_url = match self.config.availability(chain)? {
            ChainAvailability::Available { rpc_url } => rpc_url,
            ChainAvailability::MissingEndpoint => {
                warn!(chain = %chain, "No RPC endpoint configured, skipping chain");
                return Ok(ChainRun::Skipped {
                    chain,
                    reason: "no RPC endpoint configured".to_string(),
                });
            }
        };

        let source = self.rpc_source(chain, settings, rpc_url);
        let target_block = match target_block {
            Some(block) => block,
            None => source.latest_block().await?,
        };
        self.run_chain_with(chain, source, target_block).await
    }

    /// Runs `chain` up to `target_block` with events from `source`
    ///
    /// # Errors
    ///
    /// - [`ConfigError`] if `chain` is not configured or `source` serves another token
    /// - [`IngestError`](crate::IngestError) if the event log cannot be brought up to
    ///   `target_block`
    /// - [`StoreError`](crate::StoreError) if the event log or snapshot cannot be
    ///   read or written
    /// - [`ReplayError`](crate::ReplayError) if the stored events do not replay
    pub async fn run_chain_with<S: ChainEventSource>(
        &self,
        chain: NamedChain,
        source: S,
        target_block: BlockNumber,
    ) -> Result<ChainRun, HoldscanError> {
        let settings = self.config.chain(chain)?;
        if source.token() != settings.token {
            return Err(ConfigError::invalid_value(
                format!("chains.{chain}.token"),
                format!(
                    "source serves {} but {} is configured",
                    source.token(),
                    settings.token
                ),
            )
            .into());
        }

        let span = spans::run_pipeline(chain, settings.token, target_block);
        self.build_chain(chain, settings, source, target_block)
            .instrument(span)
            .await
    }

    async fn build_chain<S: ChainEventSource>(
        &self,
        chain: NamedChain,
        settings: &ChainSettings,
        source: S,
        target_block: BlockNumber,
    ) -> Result<ChainRun, HoldscanError> {
        let key = StoreKey::new(chain, settings.token);
        let store = FileEventStore::open(self.config.events_path(chain), key).await?;

        let ingestor = Ingestor::from_config(source, store, &self.config);
        let ingest = ingestor
            .ingest_through(settings.deployment_block, target_block)
            .await?;
        info!("{ingest}");
        let store = ingestor.into_store();

        let ledger = self
            .publish_ledger(chain, settings.deployment_block, &store, target_block)
            .await?;

        let snapshot = BalanceSnapshot::from_ledger(
            &ledger,
            chain,
            settings.token,
            target_block,
            self.config.min_balance,
        )?;
        snapshot.write_json(self.config.snapshot_path(chain)).await?;

        info!(
            holders = snapshot.holders(),
            total_supply = %snapshot.total_supply,
            built_through = ledger.built_through(),
            "Chain run complete"
        );
        Ok(ChainRun::Built {
            chain,
            ingest,
            ledger,
            snapshot,
        })
    }

    /// Brings the published ledger of `chain` to at least `target_block`
    ///
    /// Extends the current ledger when it starts at `from_block`, otherwise rebuilds
    /// from the whole stored range and replaces it.
    async fn publish_ledger<E: EventStore>(
        &self,
        chain: NamedChain,
        from_block: BlockNumber,
        store: &E,
        target_block: BlockNumber,
    ) -> Result<Arc<Ledger>, HoldscanError> {
        if let Some(shared) = self.ledger(chain) {
            let current = shared.snapshot();
            if current.from_block() == from_block {
                if current.built_through() >= target_block {
                    debug!(
                        built_through = current.built_through(),
                        "Published ledger already covers target"
                    );
                    return Ok(current);
                }
                let events = store
                    .read_range(current.built_through() + 1, target_block)
                    .await?;
                return Ok(shared.extend(&events, target_block)?);
            }
        }

        let events = store.read_range(from_block, target_block).await?;
        let ledger = LedgerBuilder::new(from_block).build(&events, target_block)?;

        let mut ledgers = self.ledgers.write().unwrap_or_else(PoisonError::into_inner);
        let published = match ledgers.get(&chain) {
            Some(shared) => shared.replace(ledger),
            None => {
                let shared = SharedLedger::new(ledger);
                let published = shared.snapshot();
                ledgers.insert(chain, shared);
                published
            }
        };
        Ok(published)
    }

    fn rpc_source(
        &self,
        chain: NamedChain,
        settings: &ChainSettings,
        rpc_url: Url,
    ) -> RpcEventSource<alloy_provider::RootProvider> {
        RpcEventSource::connect_http(rpc_url, chain, settings.token)
            .with_max_block_range(self.config.get_max_block_range(chain))
            .with_timeout(self.config.get_rpc_timeout(chain))
            .with_rate_limit_delay(self.config.get_rate_limit_delay(chain))
    }
}
