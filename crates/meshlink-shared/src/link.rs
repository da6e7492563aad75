//! Share-link codec.
//!
//! Channel sets and contacts travel out-of-band (QR code, pasted link) as a
//! `https://meshtastic.org/...` URL whose fragment carries the value's
//! binary serialization, base64url-encoded without padding.  The payload
//! sits in the fragment rather than the query string so that link-sharing
//! services never see or mangle it.
//!
//! Accepted shapes:
//!
//! ```text
//! https://meshtastic.org/e/#<payload>            channel set, canonical
//! https://meshtastic.org/e#<payload>             channel set, no slash
//! https://meshtastic.org/channel/e/#<payload>    channel set, long form
//! https://meshtastic.org/v/#<payload>            contact (same variants)
//! ```
//!
//! `www.meshtastic.org` is accepted everywhere, host and path matching is
//! case-insensitive, and the merge-vs-replace flag may appear either as
//! `?add=true` before the fragment or appended after the payload.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use url::Url;

use crate::channel::ChannelSet;
use crate::constants::{
    ADD_SUFFIX, CHANNEL_SHARE_PATHS, CONTACT_SHARE_PATHS, SHARE_HOST, SHARE_HOST_WWW,
};
use crate::contact::SharedContact;
use crate::error::LinkError;

/// What a share link carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    ChannelSet,
    Contact,
}

/// A validated share link, parsed but not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshLink {
    pub kind: LinkKind,
    /// Raw binary payload from the fragment.
    pub payload: Vec<u8>,
    /// Merge-into-existing ("add") rather than replace.
    pub add: bool,
}

impl MeshLink {
    /// Parse and validate a share URL.
    ///
    /// Host and path are hard-validated: anything that is not a recognized
    /// share link fails with a typed error rather than an empty result.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let url = Url::parse(input.trim()).map_err(|_| LinkError::InvalidUrl)?;
        if url.scheme() != "https" {
            return Err(LinkError::InvalidUrl);
        }

        let host = url.host_str().ok_or(LinkError::InvalidUrl)?;
        if !host.eq_ignore_ascii_case(SHARE_HOST) && !host.eq_ignore_ascii_case(SHARE_HOST_WWW) {
            return Err(LinkError::InvalidHost(host.to_string()));
        }

        let kind = match_share_path(url.path())?;

        // "add" as a query parameter, before the fragment.
        let mut add = url
            .query_pairs()
            .any(|(k, v)| k.eq_ignore_ascii_case("add") && v.eq_ignore_ascii_case("true"));

        let fragment = match url.fragment() {
            Some(f) if !f.is_empty() => f,
            _ => return Err(LinkError::MissingPayload),
        };

        // "add" appended after the payload inside the fragment.  Any
        // query-shaped suffix is stripped before base64 decoding; only
        // `?add=true` sets the flag.
        let encoded = match fragment.split_once('?') {
            Some((payload, suffix)) => {
                if format!("?{suffix}").eq_ignore_ascii_case(ADD_SUFFIX) {
                    add = true;
                }
                payload
            }
            None => fragment,
        };
        if encoded.is_empty() {
            return Err(LinkError::MissingPayload);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| LinkError::Base64Decode)?;

        Ok(Self { kind, payload, add })
    }
}

/// A decoded channel-set link: the set plus the merge-vs-replace intent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSetLink {
    pub channel_set: ChannelSet,
    pub add: bool,
}

impl ChannelSet {
    /// Encode this set as a shareable URL.
    pub fn to_link(&self, add: bool) -> String {
        let bytes = bincode::serialize(self).expect("channel set serialization");
        share_url(CHANNEL_SHARE_PATHS[0], &bytes, add)
    }

    /// Decode a shareable URL back into a channel set.
    pub fn from_link(input: &str) -> Result<ChannelSetLink, LinkError> {
        let link = MeshLink::parse(input)?;
        if link.kind != LinkKind::ChannelSet {
            return Err(LinkError::WrongShareType);
        }
        let channel_set =
            bincode::deserialize(&link.payload).map_err(|_| LinkError::PayloadDecode)?;
        Ok(ChannelSetLink {
            channel_set,
            add: link.add,
        })
    }
}

impl SharedContact {
    /// Encode this contact as a shareable URL.
    pub fn to_link(&self) -> String {
        let bytes = bincode::serialize(self).expect("contact serialization");
        share_url(CONTACT_SHARE_PATHS[0], &bytes, false)
    }

    /// Decode a shareable URL back into a contact.
    pub fn from_link(input: &str) -> Result<Self, LinkError> {
        let link = MeshLink::parse(input)?;
        if link.kind != LinkKind::Contact {
            return Err(LinkError::WrongShareType);
        }
        bincode::deserialize(&link.payload).map_err(|_| LinkError::PayloadDecode)
    }
}

fn match_share_path(path: &str) -> Result<LinkKind, LinkError> {
    let is_any = |paths: &[&str]| paths.iter().any(|p| path.eq_ignore_ascii_case(p));
    if is_any(CHANNEL_SHARE_PATHS) {
        Ok(LinkKind::ChannelSet)
    } else if is_any(CONTACT_SHARE_PATHS) {
        Ok(LinkKind::Contact)
    } else {
        Err(LinkError::UnrecognizedPath(path.to_string()))
    }
}

fn share_url(path: &str, payload: &[u8], add: bool) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(payload);
    if add {
        format!("https://{SHARE_HOST}{path}{ADD_SUFFIX}#{encoded}")
    } else {
        format!("https://{SHARE_HOST}{path}#{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ModemPreset};
    use crate::contact::UserProfile;

    fn sample_set() -> ChannelSet {
        let mut set = ChannelSet::with_default_primary();
        set.radio.modem_preset = ModemPreset::MediumFast;
        set.radio.slot = 20;
        set.push(Channel::new("admin", vec![0x42; 16])).unwrap();
        set
    }

    fn sample_contact() -> SharedContact {
        SharedContact::new(
            0xdeadbeef,
            UserProfile {
                long_name: "Base Camp".to_string(),
                short_name: "BC".to_string(),
                public_key: vec![0x11; 32],
            },
        )
    }

    #[test]
    fn test_channel_set_roundtrip() {
        let set = sample_set();
        let url = set.to_link(false);
        let decoded = ChannelSet::from_link(&url).expect("decode should work");
        assert_eq!(decoded.channel_set, set);
        assert!(!decoded.add);
    }

    #[test]
    fn url_is_base64url_without_padding() {
        let url = sample_set().to_link(false);
        let fragment = url.split('#').nth(1).unwrap();
        assert!(!fragment.contains('='));
        assert!(!fragment.contains('+'));
        assert!(!fragment.contains('/'));
    }

    #[test]
    fn host_and_path_match_case_insensitively() {
        let url = sample_set().to_link(false);
        let loud = url
            .replace("https://meshtastic.org/e/", "HTTPS://MESHTASTIC.ORG/E/");
        let a = ChannelSet::from_link(&url).unwrap();
        let b = ChannelSet::from_link(&loud).unwrap();
        assert_eq!(a.channel_set, b.channel_set);
    }

    #[test]
    fn host_and_path_aliases_decode_identically() {
        let set = sample_set();
        let canonical = set.to_link(false);
        let fragment = canonical.split('#').nth(1).unwrap();

        for prefix in [
            "https://meshtastic.org/e/#",
            "https://meshtastic.org/e#",
            "https://meshtastic.org/channel/e/#",
            "https://www.meshtastic.org/e/#",
        ] {
            let decoded = ChannelSet::from_link(&format!("{prefix}{fragment}")).unwrap();
            assert_eq!(decoded.channel_set, set);
        }
    }

    #[test]
    fn add_flag_detected_in_both_positions() {
        let set = sample_set();
        let fragment = set.to_link(false).split('#').nth(1).unwrap().to_string();

        let query_form = format!("https://meshtastic.org/e/?add=true#{fragment}");
        let suffix_form = format!("https://meshtastic.org/e/#{fragment}?add=true");

        for url in [query_form, suffix_form] {
            let decoded = ChannelSet::from_link(&url).unwrap();
            assert!(decoded.add, "add flag missed in {url}");
            assert_eq!(decoded.channel_set, set);
        }

        let encoded_with_flag = set.to_link(true);
        assert!(ChannelSet::from_link(&encoded_with_flag).unwrap().add);
    }

    #[test]
    fn invalid_host_is_rejected() {
        let url = sample_set().to_link(false);
        let foreign = url.replace("meshtastic.org", "example.com");
        match ChannelSet::from_link(&foreign) {
            Err(LinkError::InvalidHost(host)) => assert_eq!(host, "example.com"),
            other => panic!("expected InvalidHost, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_path_is_rejected() {
        let url = sample_set().to_link(false);
        let bad = url.replace("/e/", "/x/");
        assert!(matches!(
            ChannelSet::from_link(&bad),
            Err(LinkError::UnrecognizedPath(_))
        ));
    }

    #[test]
    fn missing_or_garbage_payload_is_rejected() {
        assert!(matches!(
            ChannelSet::from_link("https://meshtastic.org/e/"),
            Err(LinkError::MissingPayload)
        ));
        assert!(matches!(
            ChannelSet::from_link("https://meshtastic.org/e/#not!!base64%%"),
            Err(LinkError::Base64Decode)
        ));
    }

    #[test]
    fn test_contact_roundtrip() {
        let contact = sample_contact();
        let url = contact.to_link();
        assert!(url.starts_with("https://meshtastic.org/v/#"));
        assert_eq!(SharedContact::from_link(&url).unwrap(), contact);

        let fragment = url.split('#').nth(1).unwrap();
        let long_form = format!("https://meshtastic.org/contact/v/#{fragment}");
        assert_eq!(SharedContact::from_link(&long_form).unwrap(), contact);
    }

    #[test]
    fn contact_link_is_not_a_channel_link() {
        let url = sample_contact().to_link();
        assert!(matches!(
            ChannelSet::from_link(&url),
            Err(LinkError::WrongShareType)
        ));
    }
}
