//! Worker pool dispatcher.
//!
//! # Overview
//!
//! The [`Dispatcher`] drives one pool of isolated fingerprint workers per
//! function family for the length of a scanning session:
//!
//! - [`Dispatcher::dispatch`] routes an item to the exact or perceptual pool
//!   and returns a [`Ticket`], a one-shot future for its fingerprint.
//! - Each request is tagged with a unique correlation id. Responses are matched
//!   to their ticket by id and the ticket's reply slot is retired on first
//!   use, so late or duplicate responses are dropped.
//! - A worker failure never surfaces as an error: the ticket resolves with a
//!   synthetic, globally unique fingerprint and the item ends up unique.
//! - [`Dispatcher::shutdown`] (also run on drop) refuses further requests and
//!   abandons anything in flight. Abandoned tickets resolve with
//!   [`DispatchError::Abandoned`] rather than blocking forever.
//!
//! # Example
//!
//! ```
//! use dupelens::dispatch::{DispatchConfig, Dispatcher};
//! use dupelens::scanner::{MatchMode, RawItem};
//! use chrono::Utc;
//!
//! let dispatcher = Dispatcher::new(MatchMode::Exact, &DispatchConfig::default()).unwrap();
//! let ticket = dispatcher
//!     .dispatch(&RawItem::from_bytes("a.txt", b"abc".to_vec(), Utc::now()))
//!     .unwrap();
//! let fingerprint = ticket.wait().unwrap();
//! assert_eq!(fingerprint.as_str().len(), 64);
//! ```

pub mod worker;

use std::collections::HashMap;
use std::sync::{Mutex, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::scanner::{
    ExactAlgorithm, Fingerprint, FingerprintFamily, FingerprintFunction, MatchMode, RawItem,
};
use worker::{lock, RequestId, WorkerPool};

/// Errors returned by the dispatcher and its tickets.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The session has ended; no further requests are accepted.
    #[error("dispatcher is shut down")]
    Closed,

    /// The session ended before this request was answered.
    #[error("request {0} was abandoned by pool shutdown")]
    Abandoned(RequestId),

    /// No response arrived within the configured timeout.
    #[error("request {0} timed out")]
    TimedOut(RequestId),

    /// A worker thread could not be started.
    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Pool sizing and fingerprint function options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Worker threads per function family.
    pub workers_per_pool: usize,
    /// Digest used by the exact function.
    pub exact_algorithm: ExactAlgorithm,
    /// Retry undecodable images with the exact function instead of treating
    /// them as unique.
    pub perceptual_fallback: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers_per_pool: 2,
            exact_algorithm: ExactAlgorithm::Sha256,
            perceptual_fallback: false,
        }
    }
}

/// One-shot handle for a dispatched request.
#[derive(Debug)]
pub struct Ticket {
    id: RequestId,
    family: FingerprintFamily,
    reply: Receiver<Fingerprint>,
    pending: Weak<Mutex<HashMap<RequestId, Sender<Fingerprint>>>>,
}

impl Ticket {
    pub(crate) fn new(
        id: RequestId,
        family: FingerprintFamily,
        reply: Receiver<Fingerprint>,
        pending: Weak<Mutex<HashMap<RequestId, Sender<Fingerprint>>>>,
    ) -> Self {
        Self {
            id,
            family,
            reply,
            pending,
        }
    }

    /// Correlation id of the request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Function family the request was routed to.
    #[must_use]
    pub fn family(&self) -> FingerprintFamily {
        self.family
    }

    /// Block until the fingerprint arrives.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Abandoned`] if the pool shut down first.
    pub fn wait(self) -> Result<Fingerprint, DispatchError> {
        self.reply
            .recv()
            .map_err(|_| DispatchError::Abandoned(self.id))
    }

    /// Block for at most `timeout`.
    ///
    /// On timeout the request is retired, so a response arriving later is
    /// discarded as stale.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TimedOut`] or [`DispatchError::Abandoned`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<Fingerprint, DispatchError> {
        match self.reply.recv_timeout(timeout) {
            Ok(fingerprint) => Ok(fingerprint),
            Err(RecvTimeoutError::Timeout) => {
                self.retire();
                Err(DispatchError::TimedOut(self.id))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Abandoned(self.id)),
        }
    }

    /// Receiving end of the reply slot, for waiting on several tickets at once.
    pub(crate) fn reply(&self) -> &Receiver<Fingerprint> {
        &self.reply
    }

    /// Withdraw the request so a later response is dropped as stale.
    pub(crate) fn retire(&self) {
        if let Some(pending) = self.pending.upgrade() {
            lock(&pending).remove(&self.id);
        }
    }
}

/// Routes items to per-family worker pools for one scanning session.
pub struct Dispatcher {
    mode: MatchMode,
    exact: WorkerPool,
    perceptual: Option<WorkerPool>,
}

impl Dispatcher {
    /// Start the pools needed for `mode`.
    ///
    /// The perceptual pool only exists in [`MatchMode::Visual`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Spawn`] if a thread cannot be started.
    pub fn new(mode: MatchMode, config: &DispatchConfig) -> Result<Self, DispatchError> {
        let workers = config.workers_per_pool.max(1);
        let exact = WorkerPool::spawn(
            FingerprintFunction::for_family(
                FingerprintFamily::Exact,
                config.exact_algorithm,
                false,
            ),
            workers,
        )?;
        let perceptual = match mode {
            MatchMode::Visual => Some(WorkerPool::spawn(
                FingerprintFunction::for_family(
                    FingerprintFamily::Perceptual,
                    config.exact_algorithm,
                    config.perceptual_fallback,
                ),
                workers,
            )?),
            MatchMode::Exact => None,
        };

        Ok(Self {
            mode,
            exact,
            perceptual,
        })
    }

    /// Send an item to the pool of its family.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] after [`Dispatcher::shutdown`].
    pub fn dispatch(&self, item: &RawItem) -> Result<Ticket, DispatchError> {
        let family = FingerprintFamily::for_item(self.mode, item.content_type.as_deref());
        let pool = match (family, &self.perceptual) {
            (FingerprintFamily::Perceptual, Some(pool)) => pool,
            _ => &self.exact,
        };
        pool.submit(item.content.clone())
    }

    /// Requests dispatched but not yet answered, across both pools.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.exact.in_flight() + self.perceptual.as_ref().map_or(0, WorkerPool::in_flight)
    }

    /// End the session: refuse new requests and abandon in-flight ones.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        self.exact.shutdown();
        if let Some(pool) = &self.perceptual {
            pool.shutdown();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
