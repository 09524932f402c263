//! Fingerprint worker threads and response routing.
//!
//! # Overview
//!
//! A [`WorkerPool`] owns a fixed set of worker threads for one fingerprint
//! family. Requests travel to the workers over a shared queue; responses come
//! back on a second channel to a router thread. Every request carries a
//! correlation id, and the caller waiting on it has registered a one-shot
//! reply channel under that id in the pool's pending map.
//!
//! The router resolves a response by *removing* the pending entry for its id
//! and sending the fingerprint through it. A response whose id is no longer
//! pending (already resolved, timed out, or abandoned by shutdown) is dropped.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::{DispatchError, Ticket};
use crate::scanner::{
    Fingerprint, FingerprintError, FingerprintFamily, FingerprintFunction, ItemContent,
};

/// Correlation id attached to every request.
pub type RequestId = u64;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Pending one-shot replies keyed by correlation id.
pub(crate) type PendingMap = Arc<Mutex<HashMap<RequestId, Sender<Fingerprint>>>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work item sent to a fingerprint worker.
#[derive(Debug)]
pub(crate) struct Request {
    pub id: RequestId,
    pub content: ItemContent,
}

/// Worker reply for one request.
#[derive(Debug)]
pub(crate) struct Response {
    pub id: RequestId,
    pub outcome: Result<Fingerprint, FingerprintError>,
}

/// Fixed pool of stateless fingerprint workers for one family.
pub(crate) struct WorkerPool {
    family: FingerprintFamily,
    requests: Mutex<Option<Sender<Request>>>,
    pending: PendingMap,
    stopped: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `workers` worker threads plus one router thread.
    pub fn spawn(function: FingerprintFunction, workers: usize) -> Result<Self, DispatchError> {
        let family = function.family();
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<Request>();
        let (response_tx, response_rx) = crossbeam_channel::unbounded::<Response>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let stopped = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(workers + 1);

        for index in 0..workers.max(1) {
            let function = function.clone();
            let requests = request_rx.clone();
            let responses = response_tx.clone();
            let stopped = Arc::clone(&stopped);
            let handle = thread::Builder::new()
                .name(format!("{family}-worker-{index}"))
                .spawn(move || {
                    let compute = |content: &ItemContent| function.fingerprint_content(content);
                    work(&compute, &requests, &responses, &stopped);
                })
                .map_err(DispatchError::Spawn)?;
            handles.push(handle);
        }
        // Only workers hold response senders, so the router exits once they do.
        drop(response_tx);

        let router_pending = Arc::clone(&pending);
        let router = thread::Builder::new()
            .name(format!("{family}-router"))
            .spawn(move || route(&response_rx, &router_pending, family))
            .map_err(DispatchError::Spawn)?;
        handles.push(router);

        log::debug!("Started {} {} worker(s)", workers.max(1), family);

        Ok(Self {
            family,
            requests: Mutex::new(Some(request_tx)),
            pending,
            stopped,
            handles: Mutex::new(handles),
        })
    }

    /// Queue content for fingerprinting and return the ticket that resolves it.
    pub fn submit(&self, content: ItemContent) -> Result<Ticket, DispatchError> {
        let requests = lock(&self.requests);
        let sender = requests.as_ref().ok_or(DispatchError::Closed)?;

        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        lock(&self.pending).insert(id, reply_tx);

        if sender.send(Request { id, content }).is_err() {
            lock(&self.pending).remove(&id);
            return Err(DispatchError::Closed);
        }
        log::trace!("Queued {} request {}", self.family, id);

        Ok(Ticket::new(id, self.family, reply_rx, Arc::downgrade(&self.pending)))
    }

    /// Number of requests still waiting for a response.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Refuse new work, abandon pending requests, and join every thread.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if lock(&self.requests).take().is_none() {
            return;
        }

        let abandoned = {
            let mut pending = lock(&self.pending);
            let count = pending.len();
            pending.clear();
            count
        };
        if abandoned > 0 {
            log::debug!(
                "{} pool shut down with {} request(s) in flight",
                self.family,
                abandoned
            );
        }

        for handle in lock(&self.handles).drain(..) {
            if handle.join().is_err() {
                log::warn!("A {} pool thread panicked", self.family);
            }
        }
    }
}

fn work<F>(
    compute: &F,
    requests: &Receiver<Request>,
    responses: &Sender<Response>,
    stopped: &AtomicBool,
) where
    F: Fn(&ItemContent) -> Result<Fingerprint, FingerprintError>,
{
    for request in requests {
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        // A panic fails this request only; the worker keeps serving.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| compute(&request.content)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                log::warn!(
                    "Fingerprint worker panicked on request {}: {}",
                    request.id,
                    message
                );
                Err(FingerprintError::UnreadableContent(format!(
                    "fingerprint worker panicked: {message}"
                )))
            });
        let response = Response {
            id: request.id,
            outcome,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Match responses to their waiting callers.
///
/// Failures resolve to a synthetic fingerprint so that one bad item is treated
/// as unique instead of failing the scan.
pub(crate) fn route(
    responses: &Receiver<Response>,
    pending: &Mutex<HashMap<RequestId, Sender<Fingerprint>>>,
    family: FingerprintFamily,
) {
    for response in responses {
        let Some(waiter) = lock(pending).remove(&response.id) else {
            log::trace!(
                "Dropping stale {} response for request {}",
                family,
                response.id
            );
            continue;
        };

        let fingerprint = match response.outcome {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                log::warn!("{} fingerprint failed for request {}: {}", family, response.id, e);
                Fingerprint::synthetic()
            }
        };
        // The caller may have stopped waiting; nothing to do then.
        let _ = waiter.send(fingerprint);
    }
}
