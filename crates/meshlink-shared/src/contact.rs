//! Peer identity exchanged out-of-band, independent of channels.

use serde::{Deserialize, Serialize};

/// A node's user-facing profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub long_name: String,
    pub short_name: String,
    /// X25519 public key for direct-message encryption (empty if the peer
    /// has none).
    pub public_key: Vec<u8>,
}

/// A contact as shared via QR code or link: node number plus profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedContact {
    pub node_num: u32,
    pub user: UserProfile,
}

impl SharedContact {
    pub fn new(node_num: u32, user: UserProfile) -> Self {
        Self { node_num, user }
    }

    /// Canonical node id string, e.g. `!0a1b2c3d`.
    pub fn node_id(&self) -> String {
        format!("!{:08x}", self.node_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_zero_padded_hex() {
        let contact = SharedContact::new(
            0x0a1b2c3d,
            UserProfile {
                long_name: "Test Node".to_string(),
                short_name: "TN".to_string(),
                public_key: vec![],
            },
        );
        assert_eq!(contact.node_id(), "!0a1b2c3d");

        let low = SharedContact::new(7, UserProfile::default());
        assert_eq!(low.node_id(), "!00000007");
    }
}
