//! Outbound application packets and message delivery status.

use serde::{Deserialize, Serialize};

use crate::constants::ID_BROADCAST;

/// Application-level port a packet is addressed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortNum {
    TextMessage,
    Reaction,
    Position,
    Telemetry,
    Admin,
}

/// Delivery status of a stored message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageStatus {
    /// Waiting to be handed to the radio.
    Queued,
    /// Sent, awaiting acknowledgement.
    Enroute,
    /// Acked by another node on the mesh.
    Delivered,
    /// Acked by the destination itself.
    Received,
    /// Send failed.
    Error,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Enroute => "enroute",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Received => "received",
            MessageStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(MessageStatus::Queued),
            "enroute" => Some(MessageStatus::Enroute),
            "delivered" => Some(MessageStatus::Delivered),
            "received" => Some(MessageStatus::Received),
            "error" => Some(MessageStatus::Error),
            _ => None,
        }
    }
}

/// An outbound packet as handed to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataPacket {
    /// Mesh packet id, unique per send attempt.
    pub id: u32,
    /// Destination node id (`!xxxxxxxx`) or [`ID_BROADCAST`].
    pub to: String,
    /// Index into the current channel set.
    pub channel: i32,
    pub port: PortNum,
    pub payload: Vec<u8>,
    pub want_ack: bool,
}

impl DataPacket {
    /// Build a text message packet.
    pub fn new_text(id: u32, to: impl Into<String>, channel: i32, text: &str) -> Self {
        Self {
            id,
            to: to.into(),
            channel,
            port: PortNum::TextMessage,
            payload: text.as_bytes().to_vec(),
            want_ack: true,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == ID_BROADCAST
    }

    /// Decode the payload as UTF-8 text for text-carrying ports.
    pub fn text(&self) -> Option<String> {
        match self.port {
            PortNum::TextMessage | PortNum::Reaction => {
                String::from_utf8(self.payload.clone()).ok()
            }
            _ => None,
        }
    }

    /// Serialize to binary (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_roundtrip() {
        let packet = DataPacket::new_text(42, "!0000002a", 1, "hello mesh");
        let bytes = packet.to_bytes().unwrap();
        let restored = DataPacket::from_bytes(&bytes).unwrap();
        assert_eq!(packet, restored);
        assert_eq!(restored.text().as_deref(), Some("hello mesh"));
    }

    #[test]
    fn non_text_port_has_no_text() {
        let packet = DataPacket {
            id: 1,
            to: ID_BROADCAST.to_string(),
            channel: 0,
            port: PortNum::Position,
            payload: vec![1, 2, 3],
            want_ack: false,
        };
        assert!(packet.text().is_none());
        assert!(packet.is_broadcast());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            MessageStatus::Queued,
            MessageStatus::Enroute,
            MessageStatus::Delivered,
            MessageStatus::Received,
            MessageStatus::Error,
        ] {
            assert_eq!(MessageStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(MessageStatus::from_str("bogus"), None);
    }
}
