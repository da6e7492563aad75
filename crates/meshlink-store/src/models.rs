//! Domain model structs persisted in the local database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer.

use chrono::{DateTime, Utc};
use meshlink_shared::{DataPacket, MessageStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StoredMessage
// ---------------------------------------------------------------------------

/// A message in the local history.
///
/// `channel` is an index into the *current* channel set; the reassignment
/// engine rewrites it whenever the channel list changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMessage {
    /// Unique row identifier.
    pub uuid: Uuid,
    /// Mesh packet id of the (latest) send attempt.
    pub packet_id: u32,
    /// Sender node id (`!xxxxxxxx`).
    pub sender: String,
    /// Destination node id or `^all`.
    pub destination: String,
    /// Index into the current channel set.
    pub channel: i32,
    /// Decoded message text.
    pub text: String,
    /// Delivery status.
    pub status: MessageStatus,
    /// How many times this message has been re-sent.
    pub retry_count: u32,
    /// When the message was received / created locally.
    pub received_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// QueuedMessage
// ---------------------------------------------------------------------------

/// A row in the offline send queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Unique row identifier.
    pub uuid: Uuid,
    /// Destination node id or `^all`.
    pub destination_id: String,
    /// Serialized [`DataPacket`] of the original send.
    pub payload: Vec<u8>,
    /// When the message entered the queue.
    pub queued_time: DateTime<Utc>,
    /// Delivery attempts made so far.
    pub attempt_count: u32,
    /// Attempts after which the row is dropped.
    pub max_retries: u32,
    /// Last attempt, `None` if the message was never attempted.
    pub last_attempt_time: Option<DateTime<Utc>>,
    /// Packet id of the original failed send.
    pub original_packet_id: u32,
}

impl QueuedMessage {
    /// Decode the stored packet payload.
    pub fn packet(&self) -> Option<DataPacket> {
        DataPacket::from_bytes(&self.payload).ok()
    }

    /// Whether the row has used up its retry budget.
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_retries
    }

    /// Age of the queue entry at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.queued_time
    }
}
