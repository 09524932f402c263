//! Ingestion controller: drives a scan from raw items to a [`ScanResult`].
//!
//! # Overview
//!
//! [`DuplicateFinder::scan`] runs the whole pipeline:
//!
//! 1. Start a [`Dispatcher`] session for the active match mode.
//! 2. Split the input into chunks of `chunk_size` items. Every item of a chunk
//!    is dispatched at once; the controller then waits for the whole chunk
//!    before issuing the next one. In-flight work is therefore bounded by the
//!    chunk size, and chunks run one after another.
//! 3. As each item resolves, in completion order, bump the processed counter
//!    and report a [`ProgressEvent`].
//! 4. Hand the fingerprinted items, in input order, to
//!    [`build_scan_result`].
//!
//! Completion order inside a chunk never affects the result: items are
//! materialized in input order and grouping starts only after every chunk has
//! resolved.
//!
//! # Example
//!
//! ```
//! use dupelens::duplicates::{DuplicateFinder, FinderConfig};
//! use dupelens::scanner::RawItem;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let items = vec![
//!     RawItem::from_bytes("a.txt", b"same".to_vec(), now),
//!     RawItem::from_bytes("b.txt", b"same".to_vec(), now),
//!     RawItem::from_bytes("c.txt", b"other".to_vec(), now),
//! ];
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let (result, stats) = finder.scan(items).unwrap();
//!
//! assert_eq!(result.groups.len(), 1);
//! assert_eq!(result.wasted_space, 4);
//! assert_eq!(stats.unreadable, 0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Select};

use crate::dispatch::{DispatchConfig, DispatchError, Dispatcher, Ticket};
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::scanner::{Fingerprint, Item, ItemId, MatchMode, RawItem};

use super::groups::{build_scan_result, ScanResult};

/// Default number of items dispatched together.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Configuration for a scan.
#[derive(Clone)]
pub struct FinderConfig {
    /// Matching policy.
    pub mode: MatchMode,
    /// Items dispatched per chunk.
    pub chunk_size: usize,
    /// Worker pool options.
    pub dispatch: DispatchConfig,
    /// Give up on a single item after this long and treat it as unique.
    /// `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Optional shutdown flag, checked between chunks.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("mode", &self.mode)
            .field("chunk_size", &self.chunk_size)
            .field("dispatch", &self.dispatch)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Exact,
            chunk_size: DEFAULT_CHUNK_SIZE,
            dispatch: DispatchConfig::default(),
            request_timeout: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the matching mode.
    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the chunk size (at least 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the worker pool options.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the per-item timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// The shutdown flag was raised between chunks.
    #[error("scan interrupted")]
    Interrupted,

    /// The worker pool failed or was torn down underneath the scan.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Counters gathered while ingesting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Items fingerprinted
    pub processed: usize,
    /// Items that could not be read or decoded and were made unique
    pub unreadable: usize,
    /// Items that hit the request timeout and were made unique
    pub timed_out: usize,
    /// Chunks dispatched
    pub chunks: usize,
    /// Wall-clock duration of the scan
    pub duration: Duration,
}

impl ScanStats {
    /// Whether some items were made unique because they failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.unreadable + self.timed_out > 0
    }
}

/// Drives scans through the worker pool.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a finder with default settings (exact mode).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Scan `items` and group them.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if the shutdown flag is raised, or
    /// [`FinderError::Dispatch`] if the worker pool cannot be started.
    /// Unreadable items never fail the scan.
    pub fn scan(&self, items: Vec<RawItem>) -> Result<(ScanResult, ScanStats), FinderError> {
        let start = Instant::now();

        if items.is_empty() {
            log::debug!("Nothing to scan");
            return Ok((build_scan_result(Vec::new()), ScanStats::default()));
        }

        log::info!(
            "Scanning {} item(s) in {} mode",
            items.len(),
            self.config.mode
        );
        let dispatcher = Dispatcher::new(self.config.mode, &self.config.dispatch)?;
        let ingested = self.ingest(&dispatcher, &items);
        dispatcher.shutdown();

        let (scanned, mut stats) = ingested?;
        stats.duration = start.elapsed();

        if stats.is_degraded() {
            log::warn!(
                "{} item(s) could not be fingerprinted and were treated as unique",
                stats.unreadable + stats.timed_out
            );
        }

        Ok((build_scan_result(scanned), stats))
    }

    /// Fingerprint every item chunk by chunk through an existing session.
    ///
    /// Returned items are in input order with ids assigned by position.
    ///
    /// # Errors
    ///
    /// See [`DuplicateFinder::scan`].
    pub fn ingest(
        &self,
        dispatcher: &Dispatcher,
        items: &[RawItem],
    ) -> Result<(Vec<Item>, ScanStats), FinderError> {
        let total = items.len();
        let chunk_size = self.config.chunk_size.max(1);
        let mut scanned = Vec::with_capacity(total);
        let mut stats = ScanStats::default();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_scan_start(total);
        }

        for (chunk_index, chunk) in items.chunks(chunk_size).enumerate() {
            if self.config.is_shutdown_requested() {
                log::info!("Scan interrupted after {} item(s)", stats.processed);
                dispatcher.shutdown();
                return Err(FinderError::Interrupted);
            }

            let tickets = chunk
                .iter()
                .map(|raw| dispatcher.dispatch(raw))
                .collect::<Result<Vec<Ticket>, DispatchError>>()?;
            stats.chunks += 1;
            log::debug!(
                "Chunk {} dispatched: {} item(s), {} in flight",
                chunk_index + 1,
                chunk.len(),
                dispatcher.in_flight()
            );

            let fingerprints = self.await_chunk(chunk, tickets, total, &mut stats)?;
            for (raw, fingerprint) in chunk.iter().zip(fingerprints) {
                let id = ItemId(scanned.len() as u64);
                scanned.push(Item::from_raw(id, raw, fingerprint));
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_scan_end();
        }

        Ok((scanned, stats))
    }

    /// Wait for every ticket of a chunk, reporting items as they complete.
    ///
    /// With a request timeout, the chunk gives up once no ticket has resolved
    /// for that long: every ticket still waiting is retired and its item made
    /// unique. Fingerprints come back in chunk order.
    fn await_chunk(
        &self,
        chunk: &[RawItem],
        tickets: Vec<Ticket>,
        total: usize,
        stats: &mut ScanStats,
    ) -> Result<Vec<Fingerprint>, FinderError> {
        let mut resolved: Vec<Option<Fingerprint>> = vec![None; tickets.len()];
        let mut waiting: Vec<Option<Ticket>> = tickets.into_iter().map(Some).collect();

        loop {
            let open: Vec<usize> = (0..waiting.len())
                .filter(|&i| waiting[i].is_some())
                .collect();
            if open.is_empty() {
                break;
            }

            let next = {
                let receivers: Vec<&Receiver<Fingerprint>> =
                    waiting.iter().flatten().map(Ticket::reply).collect();
                let mut select = Select::new();
                for receiver in receivers.iter().copied() {
                    select.recv(receiver);
                }
                let operation = match self.config.request_timeout {
                    Some(timeout) => select.select_timeout(timeout).ok(),
                    None => Some(select.select()),
                };
                operation.map(|operation| {
                    let position = operation.index();
                    (open[position], operation.recv(receivers[position]))
                })
            };

            match next {
                Some((index, outcome)) => {
                    let Some(ticket) = waiting[index].take() else {
                        continue;
                    };
                    let fingerprint =
                        outcome.map_err(|_| DispatchError::Abandoned(ticket.id()))?;
                    let raw = &chunk[index];
                    if fingerprint.is_synthetic() {
                        stats.unreadable += 1;
                        log::warn!("Unreadable content, treating as unique: {}", raw.relative_path);
                    }
                    resolved[index] = Some(fingerprint);
                    self.report(raw, total, stats);
                }
                None => {
                    for index in open {
                        let Some(ticket) = waiting[index].take() else {
                            continue;
                        };
                        ticket.retire();
                        let raw = &chunk[index];
                        stats.timed_out += 1;
                        log::warn!(
                            "Request {} for {} timed out, treating as unique",
                            ticket.id(),
                            raw.relative_path
                        );
                        resolved[index] = Some(Fingerprint::synthetic());
                        self.report(raw, total, stats);
                    }
                }
            }
        }

        Ok(resolved
            .into_iter()
            .map(|fingerprint| fingerprint.unwrap_or_else(Fingerprint::synthetic))
            .collect())
    }

    fn report(&self, raw: &RawItem, total: usize, stats: &mut ScanStats) {
        stats.processed += 1;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(&ProgressEvent {
                processed: stats.processed,
                total,
                current_name: raw.name.clone(),
            });
        }
    }
}
