//! Error types for request construction and wire encoding.

use thiserror::Error;

/// Result alias for codec and builder operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised synchronously by builders, the codec and the registry.
///
/// Delivery problems (unreachable peer, reset connection, timeouts) are not
/// represented here; see [`crate::failure::DeliveryFailure`].
#[derive(Error, Debug)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller passed a value a builder refuses to accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bytes matched (or failed to match) the schema shape but violate a message invariant.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unsupported version {version} for {api}")]
    UnsupportedVersion { api: String, version: i16 },

    #[error("Unknown api_key {0}")]
    UnknownApiKey(i16),

    /// Message values do not line up with the registry's field layout.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl WireError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        WireError::MalformedMessage(msg.into())
    }
}
