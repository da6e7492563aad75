//! Offline send queue management.
//!
//! Messages that cannot be delivered right away are parked in the
//! persisted `message_queue` table and re-attempted later: backoff-gated
//! in the background, immediately when the destination node comes back
//! into reach.  Maintenance sweeps are best-effort and never block the
//! send path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use meshlink_shared::{DataPacket, PortNum};
use meshlink_store::{Database, QueuedMessage};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Tuning knobs for the offline queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Hard cap on queued rows; enqueueing past it drops the message.
    pub max_queue_size: usize,
    /// Retry budget written into each new row.
    pub max_retries: u32,
    /// Minimum wait between delivery attempts of one row.
    pub min_backoff: Duration,
    /// Rows older than this are dropped by the age sweep.
    pub max_age: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            max_retries: 3,
            min_backoff: Duration::from_secs(60),
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Snapshot of queue health, for monitoring and UI.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStats {
    pub total_queued: usize,
    pub ready_for_retry: usize,
    pub average_attempts: f64,
    /// Age of the oldest entry, `None` when the queue is empty.
    pub oldest_age: Option<TimeDelta>,
}

/// Persisted FIFO queue of messages awaiting a later delivery attempt.
pub struct SendQueue {
    db: Arc<Mutex<Database>>,
    config: QueueConfig,
    counts: watch::Sender<usize>,
}

impl SendQueue {
    pub fn new(db: Arc<Mutex<Database>>, config: QueueConfig) -> Self {
        let initial = lock(&db).queued_count().unwrap_or(0);
        let (counts, _) = watch::channel(initial);
        Self { db, config, counts }
    }

    /// Observe the total queued-message count, for UI badges.
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.counts.subscribe()
    }

    /// Park a packet that could not be delivered.
    ///
    /// Only text messages are queued.  When the queue is full a cleanup
    /// pass runs first; if it is still full afterwards the message is
    /// dropped and `false` is returned.
    pub fn enqueue(&self, packet: &DataPacket) -> Result<bool> {
        if packet.port != PortNum::TextMessage {
            debug!(packet_id = packet.id, "not enqueueing non-text packet");
            return Ok(false);
        }

        {
            let db = self.db();
            if db.queued_count()? >= self.config.max_queue_size {
                warn!("queue is full, running cleanup");
                self.sweep(&db);
                if db.queued_count()? >= self.config.max_queue_size {
                    warn!(
                        packet_id = packet.id,
                        "queue still full after cleanup, dropping message"
                    );
                    return Ok(false);
                }
            }

            let row = QueuedMessage {
                uuid: Uuid::new_v4(),
                destination_id: packet.to.clone(),
                payload: packet
                    .to_bytes()
                    .map_err(|e| ServiceError::Serialization(e.to_string()))?,
                queued_time: Utc::now(),
                attempt_count: 0,
                max_retries: self.config.max_retries,
                last_attempt_time: None,
                original_packet_id: packet.id,
            };
            db.insert_queued(&row)?;
            info!(
                packet_id = packet.id,
                to = %packet.to,
                "message enqueued for later delivery"
            );
        }

        self.refresh_count();
        Ok(true)
    }

    /// Rows eligible for a delivery attempt right now, backoff-gated.
    pub fn process_ready(&self) -> Result<Vec<QueuedMessage>> {
        let ready = self
            .db()
            .ready_for_retry(Utc::now(), self.config.min_backoff)?;
        debug!(count = ready.len(), "messages ready for retry");
        Ok(ready)
    }

    /// Rows for one destination, bypassing backoff.  Used when the node is
    /// known to have become reachable.
    pub fn process_for_destination(&self, destination_id: &str) -> Result<Vec<QueuedMessage>> {
        let ready = self.db().ready_for_destination(destination_id)?;
        debug!(
            count = ready.len(),
            destination = destination_id,
            "messages ready for immediate retry"
        );
        Ok(ready)
    }

    /// Every row with retry budget left, bypassing backoff.  Used when the
    /// link to the radio comes back.
    pub fn process_all_immediately(&self) -> Result<Vec<QueuedMessage>> {
        let ready: Vec<QueuedMessage> = self
            .db()
            .get_all_queued()?
            .into_iter()
            .filter(|m| !m.is_exhausted())
            .collect();
        debug!(count = ready.len(), "messages ready for immediate retry");
        Ok(ready)
    }

    /// Record the outcome of a delivery attempt.
    ///
    /// Delivered rows are removed; failed rows get their attempt count
    /// bumped and are dropped with a warning once the budget is spent.
    pub fn update_after_attempt(&self, message: &QueuedMessage, delivered: bool) -> Result<()> {
        {
            let db = self.db();
            if delivered {
                db.delete_queued(message.uuid)?;
                info!(
                    packet_id = message.original_packet_id,
                    "removed delivered message from queue"
                );
            } else {
                let attempts = message.attempt_count + 1;
                if attempts >= message.max_retries {
                    db.delete_queued(message.uuid)?;
                    warn!(
                        packet_id = message.original_packet_id,
                        attempts, "dropping message after exhausting retries"
                    );
                } else {
                    db.update_queued_attempt(message.uuid, attempts, Utc::now())?;
                    debug!(
                        packet_id = message.original_packet_id,
                        attempts,
                        max = message.max_retries,
                        "updated retry count"
                    );
                }
            }
        }
        self.refresh_count();
        Ok(())
    }

    /// Remove the queue row for a packet that was acknowledged.
    pub fn complete_by_packet_id(&self, packet_id: u32) -> Result<bool> {
        let removed = self.db().delete_queued_by_packet_id(packet_id)?;
        if removed > 0 {
            debug!(packet_id, "removed acknowledged message from queue");
            self.refresh_count();
        }
        Ok(removed > 0)
    }

    /// Rebuild a row's packet for the next attempt, with a fresh id so the
    /// retry cannot collide with the original send.
    pub fn packet_for_retry(&self, message: &QueuedMessage) -> Option<DataPacket> {
        let mut packet = message.packet()?;
        packet.id = generate_packet_id();
        Some(packet)
    }

    /// Best-effort maintenance: drop exhausted rows, drop rows past the
    /// age limit, and trim the queue to its size cap.  Failures are logged
    /// and never propagate into the send path.
    pub fn cleanup(&self) {
        let swept = {
            let db = self.db();
            self.sweep(&db)
        };
        if swept > 0 {
            self.refresh_count();
        }
    }

    /// Queue health snapshot.
    pub fn stats(&self) -> Result<QueueStats> {
        let all = self.db().get_all_queued()?;
        let now = Utc::now();
        let ready = all
            .iter()
            .filter(|m| is_ready(m, now, self.config.min_backoff))
            .count();
        let average_attempts = if all.is_empty() {
            0.0
        } else {
            all.iter().map(|m| m.attempt_count as f64).sum::<f64>() / all.len() as f64
        };
        let oldest_age = all.iter().map(|m| m.age(now)).max();

        Ok(QueueStats {
            total_queued: all.len(),
            ready_for_retry: ready,
            average_attempts,
            oldest_age,
        })
    }

    /// Count of rows for one destination, for per-contact badges.
    pub fn count_for_destination(&self, destination_id: &str) -> Result<usize> {
        Ok(self.db().queued_count_for_destination(destination_id)?)
    }

    fn sweep(&self, db: &MutexGuard<'_, Database>) -> usize {
        let mut swept = 0;
        match db.cleanup_expired_messages() {
            Ok(n) => swept += n,
            Err(e) => warn!(error = %e, "expiry sweep failed"),
        }
        let max_age = TimeDelta::from_std(self.config.max_age)
            .unwrap_or_else(|_| TimeDelta::days(7));
        match db.cleanup_old_messages(Utc::now() - max_age) {
            Ok(n) => swept += n,
            Err(e) => warn!(error = %e, "age sweep failed"),
        }
        match db.trim_queue_to_newest(self.config.max_queue_size) {
            Ok(n) => swept += n,
            Err(e) => warn!(error = %e, "size trim failed"),
        }
        if swept > 0 {
            debug!(swept, "queue cleanup removed rows");
        }
        swept
    }

    fn refresh_count(&self) {
        if let Ok(count) = self.db().queued_count() {
            self.counts.send_replace(count);
        }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        lock(&self.db)
    }
}

/// Pure form of the SQL eligibility gate, for stats and tests.
fn is_ready(message: &QueuedMessage, now: DateTime<Utc>, min_backoff: Duration) -> bool {
    if message.is_exhausted() {
        return false;
    }
    match message.last_attempt_time {
        None => true,
        Some(last) => {
            let backoff =
                TimeDelta::from_std(min_backoff).unwrap_or_else(|_| TimeDelta::seconds(60));
            now - last >= backoff
        }
    }
}

/// Fresh packet id for a retry attempt.
pub(crate) fn generate_packet_id() -> u32 {
    rand::random()
}

fn lock(db: &Mutex<Database>) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}
