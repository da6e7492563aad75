use thiserror::Error;

/// Errors produced by the service layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] meshlink_store::StoreError),

    /// Packet payload (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The outbound transport channel is closed.
    #[error("Transport channel closed")]
    TransportClosed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServiceError>;
