//! Channel and channel-set value types.
//!
//! A channel's identity for matching purposes is the pair `(psk, name)`.
//! Its position inside a [`ChannelSet`] is presentation order only and
//! changes freely when the user edits the list.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PSK, MAX_CHANNELS, PSK_AES128_SIZE, PSK_AES256_SIZE};
use crate::error::ChannelSetError;

/// Modem preset shared by every channel on a radio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ModemPreset {
    #[default]
    LongFast,
    LongSlow,
    LongModerate,
    VeryLongSlow,
    MediumSlow,
    MediumFast,
    ShortSlow,
    ShortFast,
    ShortTurbo,
}

impl ModemPreset {
    /// Conventional channel name for this preset, used when a channel's own
    /// name is empty.
    pub fn channel_name(&self) -> &'static str {
        match self {
            ModemPreset::LongFast => "LongFast",
            ModemPreset::LongSlow => "LongSlow",
            ModemPreset::LongModerate => "LongMod",
            ModemPreset::VeryLongSlow => "VLongSlow",
            ModemPreset::MediumSlow => "MediumSlow",
            ModemPreset::MediumFast => "MediumFast",
            ModemPreset::ShortSlow => "ShortSlow",
            ModemPreset::ShortFast => "ShortFast",
            ModemPreset::ShortTurbo => "ShortTurbo",
        }
    }
}

/// Radio parameters shared by the whole channel set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RadioConfig {
    pub modem_preset: ModemPreset,
    /// Explicit frequency override in MHz, `None` to follow the region plan.
    pub override_frequency: Option<f32>,
    /// Frequency slot number within the region plan (0 = derived from the
    /// primary channel name).
    pub slot: u32,
}

/// A single channel: name, key material, and per-channel module settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Channel name.  Empty means "use the modem preset's conventional name".
    pub name: String,
    /// Pre-shared key.  Length classes:
    /// - 0 bytes: unencrypted
    /// - 1 byte: shorthand index into the well-known default key
    /// - 16 / 32 bytes: explicit AES-128 / AES-256 key material
    pub psk: Vec<u8>,
    pub uplink_enabled: bool,
    pub downlink_enabled: bool,
    /// Location-sharing precision in bits (0 = position disabled).
    pub position_precision: u32,
}

impl Channel {
    pub fn new(name: impl Into<String>, psk: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            psk,
            uplink_enabled: false,
            downlink_enabled: false,
            position_precision: 0,
        }
    }

    /// The default primary channel: empty name, one-byte PSK selecting the
    /// well-known default key.
    pub fn primary_default() -> Self {
        Self::new("", vec![1])
    }

    /// Expand the stored PSK into actual key material.
    ///
    /// A one-byte PSK is a shorthand: byte `0` disables encryption, byte `n`
    /// (n >= 1) selects the default key with its last byte offset by `n - 1`.
    /// Any other length is returned as-is.
    pub fn resolved_psk(&self) -> Vec<u8> {
        if self.psk.len() != 1 {
            return self.psk.clone();
        }
        let index = self.psk[0];
        if index == 0 {
            return Vec::new();
        }
        let mut key = DEFAULT_PSK.to_vec();
        let last = key.len() - 1;
        key[last] = key[last].wrapping_add(index - 1);
        key
    }

    /// Whether sends on this channel are encrypted at all.
    pub fn is_encrypted(&self) -> bool {
        !self.resolved_psk().is_empty()
    }

    /// Whether the stored PSK has one of the accepted lengths.
    pub fn has_valid_psk(&self) -> bool {
        matches!(self.psk.len(), 0 | 1 | PSK_AES128_SIZE | PSK_AES256_SIZE)
    }

    /// Matching identity: raw PSK bytes plus name.  List position is not
    /// part of a channel's identity.
    pub fn identity(&self) -> (&[u8], &str) {
        (&self.psk, &self.name)
    }

    /// Name shown to the user, falling back to the modem preset's
    /// conventional name when the channel name is empty.
    pub fn display_name(&self, preset: ModemPreset) -> &str {
        if self.name.is_empty() {
            preset.channel_name()
        } else {
            &self.name
        }
    }

    /// Hex rendering of the raw PSK, for logs.
    pub fn psk_hex(&self) -> String {
        hex::encode(&self.psk)
    }
}

/// An ordered list of channels plus the shared radio parameters.
///
/// Index 0 is the primary channel once the set is non-empty.  The set never
/// grows past [`MAX_CHANNELS`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelSet {
    pub channels: Vec<Channel>,
    pub radio: RadioConfig,
}

impl ChannelSet {
    pub fn new(radio: RadioConfig) -> Self {
        Self {
            channels: Vec::new(),
            radio,
        }
    }

    /// A set holding only the default primary channel.
    pub fn with_default_primary() -> Self {
        let mut set = Self::default();
        set.channels.push(Channel::primary_default());
        set
    }

    pub fn primary(&self) -> Option<&Channel> {
        self.channels.first()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Append a channel, enforcing the size cap.
    pub fn push(&mut self, channel: Channel) -> Result<(), ChannelSetError> {
        if self.channels.len() >= MAX_CHANNELS {
            return Err(ChannelSetError::Full);
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Whether a channel with the same `(psk, name)` identity is present.
    pub fn contains(&self, channel: &Channel) -> bool {
        self.channels
            .iter()
            .any(|c| c.identity() == channel.identity())
    }

    /// Merge another set's channels into this one (the "add" flow).
    ///
    /// Channels already present by `(psk, name)` identity are skipped.
    /// Returns the number of channels actually added; channels past the
    /// size cap are not taken.
    pub fn merge(&mut self, other: &ChannelSet) -> usize {
        let mut added = 0;
        for channel in &other.channels {
            if self.contains(channel) {
                continue;
            }
            if self.push(channel.clone()).is_err() {
                break;
            }
            added += 1;
        }
        added
    }

    /// Display name for the channel at `index`.
    pub fn channel_name(&self, index: usize) -> Option<&str> {
        self.channels
            .get(index)
            .map(|c| c.display_name(self.radio.modem_preset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_psk_expands_default_key_index() {
        let ch = Channel::new("", vec![1]);
        assert_eq!(ch.resolved_psk(), DEFAULT_PSK.to_vec());

        // Index 3 offsets the last byte by 2.
        let ch = Channel::new("", vec![3]);
        let key = ch.resolved_psk();
        assert_eq!(key[..15], DEFAULT_PSK[..15]);
        assert_eq!(key[15], DEFAULT_PSK[15].wrapping_add(2));
    }

    #[test]
    fn one_byte_zero_psk_disables_encryption() {
        let ch = Channel::new("open", vec![0]);
        assert!(ch.resolved_psk().is_empty());
        assert!(!ch.is_encrypted());
    }

    #[test]
    fn explicit_psk_passes_through() {
        let key = vec![0xAB; 32];
        let ch = Channel::new("secret", key.clone());
        assert_eq!(ch.resolved_psk(), key);
        assert!(ch.is_encrypted());
    }

    #[test]
    fn empty_name_displays_preset_name() {
        let ch = Channel::primary_default();
        assert_eq!(ch.display_name(ModemPreset::LongFast), "LongFast");
        let named = Channel::new("admin", vec![1]);
        assert_eq!(named.display_name(ModemPreset::LongFast), "admin");
    }

    #[test]
    fn push_enforces_channel_cap() {
        let mut set = ChannelSet::default();
        for i in 0..MAX_CHANNELS {
            set.push(Channel::new(format!("ch{i}"), vec![1])).unwrap();
        }
        assert!(set.push(Channel::new("overflow", vec![1])).is_err());
        assert_eq!(set.len(), MAX_CHANNELS);
    }

    #[test]
    fn merge_skips_identical_channels_and_respects_cap() {
        let mut ours = ChannelSet::with_default_primary();
        ours.push(Channel::new("alpha", vec![0x11; 16])).unwrap();

        let mut theirs = ChannelSet::default();
        // Identical to ours by (psk, name): skipped.
        theirs.channels.push(Channel::new("alpha", vec![0x11; 16]));
        // Same name, different psk: a distinct channel.
        theirs.channels.push(Channel::new("alpha", vec![0x22; 16]));
        theirs.channels.push(Channel::new("beta", vec![0x33; 16]));

        let added = ours.merge(&theirs);
        assert_eq!(added, 2);
        assert_eq!(ours.len(), 4);
    }
}
