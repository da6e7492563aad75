//! Human-in-the-loop retry coordination.
//!
//! When a reliable send fails or times out, the caller asks the coordinator
//! whether to retry.  The question is published to a single observable
//! "current retry event" slot (at most one prompt is shown to the user at a
//! time) while the answer travels back through a per-packet one-shot slot,
//! so any number of outstanding requests stay independent.
//!
//! A request resolves exactly once, by whichever of these happens first:
//! an explicit [`respond_to_retry`], the timeout (fail-open: auto-retry),
//! or a bulk [`cancel_pending_retries`] (deterministic decline).  Removal
//! from the pending map is the single-resolution gate.
//!
//! [`respond_to_retry`]: RetryCoordinator::respond_to_retry
//! [`cancel_pending_retries`]: RetryCoordinator::cancel_pending_retries

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

/// A pending retry decision, keyed by the failed packet's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// A text message send failed.
    Message {
        packet_id: u32,
        text: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A reaction (tapback) send failed.
    Reaction {
        packet_id: u32,
        emoji: String,
        attempt: u32,
        max_attempts: u32,
    },
}

impl RetryEvent {
    pub fn packet_id(&self) -> u32 {
        match self {
            RetryEvent::Message { packet_id, .. } => *packet_id,
            RetryEvent::Reaction { packet_id, .. } => *packet_id,
        }
    }
}

/// Mediator between senders awaiting a retry decision and the UI.
pub struct RetryCoordinator {
    /// The prompt currently shown to the user, if any.
    current: watch::Sender<Option<RetryEvent>>,
    /// Resolution slots for every outstanding request.
    pending: Mutex<HashMap<u32, oneshot::Sender<bool>>>,
}

impl RetryCoordinator {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Observe the current retry prompt.  The slot holds `None` whenever no
    /// prompt is outstanding.
    pub fn subscribe(&self) -> watch::Receiver<Option<RetryEvent>> {
        self.current.subscribe()
    }

    /// Publish `event` and suspend until a decision is made.
    ///
    /// Resolves to the responder's choice, to `true` when `timeout` elapses
    /// unanswered (fail-open: auto-retry), or to `false` on a bulk cancel.
    /// Other tasks keep running while the caller waits.
    pub async fn request_retry(&self, event: RetryEvent, timeout: Duration) -> bool {
        let packet_id = event.packet_id();
        let (tx, mut rx) = oneshot::channel();
        self.pending_lock().insert(packet_id, tx);
        self.current.send_replace(Some(event));
        debug!(packet_id, "retry decision requested");

        let decision = tokio::select! {
            response = &mut rx => response.unwrap_or(false),
            _ = tokio::time::sleep(timeout) => {
                // Taking our sender out of the map claims the resolution.
                // If it is already gone, a response won the race and must
                // be honored.
                let claimed = self.pending_lock().remove(&packet_id);
                match claimed {
                    Some(_) => {
                        debug!(packet_id, "retry prompt timed out; auto-retrying");
                        true
                    }
                    None => rx.await.unwrap_or(false),
                }
            }
        };

        // Clear the published prompt, unless a newer event already
        // replaced it.
        self.current.send_if_modified(|current| {
            if current.as_ref().map(RetryEvent::packet_id) == Some(packet_id) {
                *current = None;
                true
            } else {
                false
            }
        });

        debug!(packet_id, decision, "retry request resolved");
        decision
    }

    /// Resolve the request for `packet_id`.  Unknown ids (already resolved,
    /// timed out, or never requested) are ignored.
    pub fn respond_to_retry(&self, packet_id: u32, should_retry: bool) {
        match self.pending_lock().remove(&packet_id) {
            Some(tx) => {
                let _ = tx.send(should_retry);
            }
            None => debug!(packet_id, "retry response for unknown packet; ignoring"),
        }
    }

    /// Resolve every outstanding request to `false` immediately.
    ///
    /// Used on service disconnect / shutdown so no caller is left waiting
    /// for a timeout.
    pub fn cancel_pending_retries(&self) {
        let drained: Vec<_> = {
            let mut pending = self.pending_lock();
            pending.drain().collect()
        };
        if drained.is_empty() {
            return;
        }
        warn!(count = drained.len(), "cancelling all pending retry requests");
        for (_, tx) in drained {
            let _ = tx.send(false);
        }
    }

    fn pending_lock(&self) -> MutexGuard<'_, HashMap<u32, oneshot::Sender<bool>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
