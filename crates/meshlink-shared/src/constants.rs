/// Maximum number of channels a radio can hold.
pub const MAX_CHANNELS: usize = 8;

/// The well-known default channel key.  A one-byte PSK of value `n` selects
/// this key with its last byte offset by `n - 1`.
pub const DEFAULT_PSK: [u8; 16] = [
    0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59, 0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69,
    0x01,
];

/// Explicit PSK lengths accepted on a channel (AES-128 / AES-256).
pub const PSK_AES128_SIZE: usize = 16;
pub const PSK_AES256_SIZE: usize = 32;

/// Canonical host for share links.
pub const SHARE_HOST: &str = "meshtastic.org";

/// Accepted host alias for share links.
pub const SHARE_HOST_WWW: &str = "www.meshtastic.org";

/// Accepted URL paths for a channel-set share link.  The first entry is the
/// canonical form used when encoding.
pub const CHANNEL_SHARE_PATHS: &[&str] = &["/e/", "/e", "/channel/e/"];

/// Accepted URL paths for a contact share link.
pub const CONTACT_SHARE_PATHS: &[&str] = &["/v/", "/v", "/contact/v/"];

/// Query parameter / fragment suffix marking a link as "add to existing
/// channels" rather than "replace".
pub const ADD_SUFFIX: &str = "?add=true";

/// Destination id meaning "broadcast to the whole mesh".
pub const ID_BROADCAST: &str = "^all";
