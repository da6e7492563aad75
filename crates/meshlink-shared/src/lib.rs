//! # meshlink-shared
//!
//! Pure value types and codecs for the Meshlink client: the channel model,
//! share-link encoding/decoding, outbound packets, and the channel remap
//! algorithm.  Everything here is synchronous, allocation-light, and free
//! of I/O; persistence and async coordination live in `meshlink-store` and
//! `meshlink-service`.

pub mod channel;
pub mod constants;
pub mod contact;
pub mod link;
pub mod packet;
pub mod remap;

mod error;

pub use channel::{Channel, ChannelSet, ModemPreset, RadioConfig};
pub use contact::{SharedContact, UserProfile};
pub use error::{ChannelSetError, LinkError};
pub use link::{ChannelSetLink, LinkKind, MeshLink};
pub use packet::{DataPacket, MessageStatus, PortNum};
pub use remap::{channel_remap, ChannelRemap};
