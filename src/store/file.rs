// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON Lines event store with a versioned metadata sidecar

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use alloy_chains::NamedChain;
use alloy_primitives::{Address, BlockNumber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use super::{EventStore, StoreKey, StoredEvents};
use crate::config::constants::STORE_FORMAT_VERSION;
use crate::errors::{NormalizationError, StoreError};
use crate::normalize::verify_canonical;
use crate::{spans, BlockRange, TransferEvent};

/// Line number reported for problems in the metadata sidecar
const METADATA_LINE: usize = 0;

/// Contents of the metadata sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoreMetadata {
    version: u32,
    chain: NamedChain,
    token: Address,
    covered_from: Option<BlockNumber>,
    covered_through: Option<BlockNumber>,
}

/// Rows read back from the event log
struct LoadedRows {
    events: Vec<TransferEvent>,
    /// The last row was cut short by an interrupted append
    torn: bool,
}

/// Event store persisted as one JSON object per line
///
/// Rows carry `block_number`, `log_index`, `tx_hash`, `from`, `to` and `value`
/// (a decimal string). Coverage and the (chain, token) key live in a sidecar next
/// to the log (`events_mainnet.jsonl` → `events_mainnet.meta.json`), replaced
/// atomically through a temp file and rename.
///
/// Rows are appended before the sidecar records their coverage. On
/// [`open`](Self::open) the whole log is parsed and verified canonical; anything
/// off is reported as [`StoreError::Corrupted`] and the store refuses to load.
/// Rows past the recorded coverage were never committed: they are dropped and the
/// log is rewritten without them.
///
/// # Examples
///
/// ```rust,ignore
/// use holdscan::{EventStore, FileEventStore, StoreKey};
///
/// let key = StoreKey::new(NamedChain::Mainnet, olas_token);
/// let store = FileEventStore::open("data/events_mainnet.jsonl", key).await?;
/// println!("{} events, covered through {:?}", store.len().await, store.highest_stored_block().await);
/// ```
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    metadata_path: PathBuf,
    key: StoreKey,
    state: Mutex<StoredEvents>,
}

impl FileEventStore {
    /// Opens the log at `path`, creating nothing until the first write
    ///
    /// Rows beyond the recorded coverage, including a final row cut short by an
    /// interrupted append, are discarded.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Corrupted`] if a row cannot be parsed, the rows are not
    ///   canonical, a row precedes the recorded coverage, or the sidecar is
    ///   unreadable, from another format version, or keyed to another (chain, token)
    ///   pair
    /// - [`StoreError::Io`] if either file exists but cannot be read, or the log
    ///   cannot be rewritten
    pub async fn open(path: impl Into<PathBuf>, key: StoreKey) -> Result<Self, StoreError> {
        let path = path.into();
        let span = spans::open_event_store(key.chain, key.token, &path.display().to_string());
        Self::load(path, key).instrument(span).await
    }

    async fn load(path: PathBuf, key: StoreKey) -> Result<Self, StoreError> {
        let metadata_path = path.with_extension("meta.json");

        let LoadedRows { mut events, torn } = load_rows(&path).await?;
        let covered = match load_metadata(&metadata_path).await? {
            Some(metadata) => check_metadata(&metadata_path, &metadata, key, &events)?,
            None => None,
        };

        let committed = events.partition_point(|event| {
            covered.is_some_and(|covered| event.block_number <= covered.end())
        });
        if committed < events.len() || torn {
            warn!(
                path = %path.display(),
                dropped = events.len() - committed,
                torn,
                covered_through = ?covered.map(|c| c.end()),
                "Discarding uncommitted rows from event log"
            );
            events.truncate(committed);
            write_atomic(&path, &encode_rows(&events)?).await?;
        }

        info!(
            path = %path.display(),
            events = events.len(),
            covered = ?covered,
            "Opened event store"
        );

        Ok(Self {
            path,
            metadata_path,
            key,
            state: Mutex::new(StoredEvents::from_canonical(events, covered)),
        })
    }

    /// Path of the event log
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the metadata sidecar
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    async fn write_rows(&self, events: &[TransferEvent]) -> Result<(), StoreError> {
        let buf = encode_rows(events)?;

        create_parent_dir(&self.path).await?;

        let io_err = |details: &str, e| StoreError::io(self.path.display().to_string(), details, e);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_err("Failed to open event log for appending", e))?;
        file.write_all(&buf)
            .await
            .map_err(|e| io_err("Failed to append events", e))?;
        file.sync_data()
            .await
            .map_err(|e| io_err("Failed to sync event log", e))?;

        Ok(())
    }

    async fn write_metadata(&self, covered: BlockRange) -> Result<(), StoreError> {
        let metadata = StoreMetadata {
            version: STORE_FORMAT_VERSION,
            chain: self.key.chain,
            token: self.key.token,
            covered_from: Some(covered.start()),
            covered_through: Some(covered.end()),
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| StoreError::serialization("Failed to encode store metadata", e))?;

        write_atomic(&self.metadata_path, &json).await?;

        debug!(
            path = %self.metadata_path.display(),
            covered = %covered,
            "Saved store metadata"
        );
        Ok(())
    }

    async fn record_coverage(
        &self,
        start: Option<BlockNumber>,
        through: BlockNumber,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(covered) = state.plan_coverage(start, through)? {
            self.write_metadata(covered).await?;
            state.set_coverage(covered);
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn append(&self, events: Vec<TransferEvent>) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let fresh = state.plan_append(events)?;
        if fresh.is_empty() {
            return Ok(0);
        }

        // Rows past the recorded coverage are discarded on reopen until
        // coverage catches up
        self.write_rows(&fresh).await?;

        let added = fresh.len();
        state.extend(fresh);

        debug!(
            path = %self.path.display(),
            added,
            total = state.len(),
            "Appended events (file)"
        );
        Ok(added)
    }

    async fn read_range(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        self.state.lock().await.range(from_block, to_block)
    }

    async fn coverage(&self) -> Option<BlockRange> {
        self.state.lock().await.coverage()
    }

    async fn mark_covered(&self, through: BlockNumber) -> Result<(), StoreError> {
        self.record_coverage(None, through).await
    }

    async fn mark_window_covered(&self, range: BlockRange) -> Result<(), StoreError> {
        self.record_coverage(Some(range.start()), range.end()).await
    }

    async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    fn key(&self) -> StoreKey {
        self.key
    }

    fn name(&self) -> &'static str {
        "FileEventStore"
    }
}

fn encode_rows(events: &[TransferEvent]) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    for event in events {
        serde_json::to_writer(&mut buf, event)
            .map_err(|e| StoreError::serialization(format!("Failed to encode event {event}"), e))?;
        buf.push(b'\n');
    }
    Ok(buf)
}

async fn load_rows(path: &Path) -> Result<LoadedRows, StoreError> {
    let log_path = path.display().to_string();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %log_path, "Event log does not exist, starting empty");
            return Ok(LoadedRows {
                events: Vec::new(),
                torn: false,
            });
        }
        Err(e) => return Err(StoreError::io(log_path, "Failed to read event log", e)),
    };

    // Every complete row ends in a newline; anything after the last one is a
    // row whose append was interrupted
    let (complete, tail) = match bytes.iter().rposition(|&b| b == b'\n') {
        Some(idx) => bytes.split_at(idx + 1),
        None => (&[][..], &bytes[..]),
    };

    let mut events = Vec::new();
    let rows = complete.split(|&b| b == b'\n').enumerate();
    for (idx, row) in rows.filter(|(_, row)| !row.is_empty()) {
        events.push(parse_row(&log_path, idx + 1, row)?);
    }

    let torn = !tail.is_empty();
    if torn {
        match serde_json::from_slice::<TransferEvent>(tail) {
            // Complete row that only lacks its newline
            Ok(event) => events.push(event),
            Err(e) => debug!(
                path = %log_path,
                line = events.len() + 1,
                error = %e,
                "Ignoring partially written final row"
            ),
        }
    }

    verify_canonical(&events).map_err(|e| {
        let line = offending_row(&events, &e);
        StoreError::corrupted(&log_path, line, e.to_string())
    })?;

    Ok(LoadedRows { events, torn })
}

fn parse_row(log_path: &str, line: usize, row: &[u8]) -> Result<TransferEvent, StoreError> {
    let row = std::str::from_utf8(row)
        .map_err(|e| StoreError::corrupted(log_path, line, format!("row is not UTF-8: {e}")))?;
    serde_json::from_str(row.trim_end_matches('\r'))
        .map_err(|e| StoreError::corrupted(log_path, line, format!("unparsable row: {e}")))
}

/// 1-based row of the event that broke canonical order
fn offending_row(events: &[TransferEvent], err: &NormalizationError) -> usize {
    let offender = match err {
        NormalizationError::ConflictingDuplicate { second, .. } => second,
        NormalizationError::OrderCollision { second, .. } => second,
        NormalizationError::OutOfOrder { next, .. } => next,
    };
    events
        .iter()
        .rposition(|event| event == offender.as_ref())
        .map_or(0, |idx| idx + 1)
}

async fn load_metadata(path: &Path) -> Result<Option<StoreMetadata>, StoreError> {
    let meta_path = path.display().to_string();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(meta_path, "Failed to read store metadata", e)),
    };

    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        StoreError::corrupted(meta_path, METADATA_LINE, format!("unparsable metadata: {e}"))
    })
}

/// Validates the sidecar against `key` and the stored rows, returning the coverage
fn check_metadata(
    path: &Path,
    metadata: &StoreMetadata,
    key: StoreKey,
    events: &[TransferEvent],
) -> Result<Option<BlockRange>, StoreError> {
    let corrupted = |reason: String| {
        StoreError::corrupted(path.display().to_string(), METADATA_LINE, reason)
    };

    if metadata.version != STORE_FORMAT_VERSION {
        return Err(corrupted(format!(
            "format version {} is not supported (expected {STORE_FORMAT_VERSION})",
            metadata.version
        )));
    }
    if metadata.chain != key.chain || metadata.token != key.token {
        return Err(corrupted(format!(
            "log belongs to {}:{}, not {key}",
            metadata.chain, metadata.token
        )));
    }

    let covered = match (metadata.covered_from, metadata.covered_through) {
        (None, None) => return Ok(None),
        (Some(from), Some(through)) => BlockRange::new(from, through).ok_or_else(|| {
            corrupted(format!("coverage {from}-{through} is inverted"))
        })?,
        (from, through) => {
            return Err(corrupted(format!(
                "incomplete coverage: from {from:?} through {through:?}"
            )))
        }
    };

    if let Some(first) = events.first().filter(|e| e.block_number < covered.start()) {
        return Err(corrupted(format!(
            "event at block {} precedes coverage {covered}",
            first.block_number
        )));
    }

    Ok(Some(covered))
}

async fn create_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::io(
                    parent.display().to_string(),
                    "Failed to create data directory",
                    e,
                )
            })?;
            debug!(path = %parent.display(), "Created data directory");
        }
    }
    Ok(())
}

/// Replaces `path` with `contents` through a temp file and rename
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    create_parent_dir(path).await?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    tokio::fs::write(&temp_path, contents).await.map_err(|e| {
        StoreError::io(temp_path.display().to_string(), "Failed to write temp file", e)
    })?;
    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        StoreError::io(
            path.display().to_string(),
            format!("Failed to rename {} into place", temp_path.display()),
            e,
        )
    })?;

    Ok(())
}
