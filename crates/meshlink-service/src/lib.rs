//! # meshlink-service
//!
//! The async service layer of the Meshlink client: retry coordination for
//! uncertain sends, the offline send queue, and delivery handling that
//! connects transport routing results to both.
//!
//! The crate owns no transport and no UI.  It consumes a persistence
//! handle (`meshlink-store`) plus an outbound packet channel, and exposes
//! observable values (the current retry prompt, queue counts) for an
//! embedding application to render.

pub mod delivery;
pub mod queue;
pub mod retry;

mod error;

pub use delivery::{DeliveryConfig, DeliveryHandler, RoutingError};
pub use error::ServiceError;
pub use queue::{QueueConfig, QueueStats, SendQueue};
pub use retry::{RetryCoordinator, RetryEvent};
