//! Routing-result handling for reliable sends.
//!
//! The transport layer reports one routing result per tracked packet:
//! an ack, a NAK with an error reason, or a timeout.  This module turns
//! those results into status updates, retry prompts, and offline-queue
//! entries.  Resends leave through an outbound mpsc channel owned by the
//! transport task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use meshlink_shared::{DataPacket, MessageStatus};
use meshlink_store::{Database, StoredMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::queue::{generate_packet_id, SendQueue};
use crate::retry::{RetryCoordinator, RetryEvent};

/// Routing outcome reported by the radio for a tracked packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingError {
    /// No error: the packet was acknowledged.
    None,
    /// No route towards the destination.
    NoRoute,
    /// The destination NAKed the packet.
    GotNak,
    /// The radio gave up waiting for an ack.
    Timeout,
    /// The packet referenced a channel the radio does not have.
    NoChannel,
    /// Hop-by-hop retransmissions were exhausted.
    MaxRetransmit,
}

impl RoutingError {
    pub fn is_ack(&self) -> bool {
        matches!(self, RoutingError::None)
    }
}

/// Tuning knobs for the delivery handler.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Hard cap on coordinator-driven resends of one message.
    pub max_retry_attempts: u32,
    /// Pause before a confirmed resend goes back out.
    pub retry_delay: Duration,
    /// How long the retry prompt stays open before failing open.
    pub prompt_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 5,
            retry_delay: Duration::from_secs(5),
            prompt_timeout: Duration::from_secs(30),
        }
    }
}

/// Turns transport routing results into message-state transitions.
pub struct DeliveryHandler {
    db: Arc<Mutex<Database>>,
    queue: Arc<SendQueue>,
    coordinator: Arc<RetryCoordinator>,
    outbound: mpsc::Sender<DataPacket>,
    config: DeliveryConfig,
}

impl DeliveryHandler {
    pub fn new(
        db: Arc<Mutex<Database>>,
        queue: Arc<SendQueue>,
        coordinator: Arc<RetryCoordinator>,
        outbound: mpsc::Sender<DataPacket>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            db,
            queue,
            coordinator,
            outbound,
            config,
        }
    }

    /// Process the routing result for `packet_id`.
    ///
    /// `from` is the node that produced the result (for an ack, the acking
    /// node; an ack from the destination itself upgrades the status to
    /// received).
    pub async fn handle_routing_result(
        &self,
        packet_id: u32,
        from: &str,
        error: RoutingError,
    ) -> Result<()> {
        let message = self.db().get_message_by_packet_id(packet_id)?;
        let Some(message) = message else {
            debug!(packet_id, "routing result for unknown packet; ignoring");
            return Ok(());
        };

        debug!(
            packet_id,
            ?error,
            retry_count = message.retry_count,
            "routing result"
        );

        if error.is_ack() {
            self.handle_ack(&message, from)?;
            return Ok(());
        }

        let retryable = error == RoutingError::MaxRetransmit
            && message.retry_count < self.config.max_retry_attempts;
        if retryable {
            self.retry_with_confirmation(message).await
        } else {
            self.park_or_fail(&message)
        }
    }

    fn handle_ack(&self, message: &StoredMessage, from: &str) -> Result<()> {
        let status = if from == message.destination {
            MessageStatus::Received
        } else {
            MessageStatus::Delivered
        };
        self.db().update_message_status(message.packet_id, status)?;
        self.queue.complete_by_packet_id(message.packet_id)?;
        info!(
            packet_id = message.packet_id,
            status = status.as_str(),
            "send acknowledged"
        );
        Ok(())
    }

    /// Ask the operator whether to resend, then do so.
    async fn retry_with_confirmation(&self, message: StoredMessage) -> Result<()> {
        let attempt = message.retry_count + 1;
        let event = RetryEvent::Message {
            packet_id: message.packet_id,
            text: message.text.clone(),
            attempt,
            max_attempts: self.config.max_retry_attempts,
        };

        let should_retry = self
            .coordinator
            .request_retry(event, self.config.prompt_timeout)
            .await;
        if !should_retry {
            info!(packet_id = message.packet_id, "retry declined");
            self.db()
                .update_message_status(message.packet_id, MessageStatus::Error)?;
            return Ok(());
        }

        let new_id = generate_packet_id();
        self.db()
            .update_message_for_retry(message.uuid, new_id, attempt)?;
        warn!(
            packet_id = message.packet_id,
            new_id, attempt, "resending message"
        );

        let packet =
            DataPacket::new_text(new_id, &message.destination, message.channel, &message.text);
        tokio::time::sleep(self.config.retry_delay).await;
        self.outbound
            .send(packet)
            .await
            .map_err(|_| ServiceError::TransportClosed)
    }

    /// Hand the message to the offline queue; mark it failed only when the
    /// queue refuses it.
    fn park_or_fail(&self, message: &StoredMessage) -> Result<()> {
        let packet = DataPacket::new_text(
            message.packet_id,
            &message.destination,
            message.channel,
            &message.text,
        );
        if self.queue.enqueue(&packet)? {
            self.db()
                .update_message_status(message.packet_id, MessageStatus::Queued)?;
        } else {
            warn!(packet_id = message.packet_id, "send failed and queue refused message");
            self.db()
                .update_message_status(message.packet_id, MessageStatus::Error)?;
        }
        Ok(())
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
