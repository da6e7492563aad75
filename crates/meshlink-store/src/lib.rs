//! # meshlink-store
//!
//! Local persistence for the Meshlink client, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for stored
//! messages and the offline send queue, plus the transactional channel
//! reassignment used when the channel list is edited.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod queue;
pub mod reassign;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use reassign::RemapReport;
