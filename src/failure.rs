//! Delivery failures and their mapping onto response error codes.
//!
//! A [`DeliveryFailure`] means no genuine reply could be obtained for a sent
//! request. It is never returned to the caller of the request pipeline;
//! [`ProtocolRequest::error_response`](crate::message::ProtocolRequest::error_response)
//! turns it into a response carrying the code chosen here.

use crate::error::WireError;
use crate::protocol::ErrorCode;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryFailure {
    #[error("destination {destination} is unreachable: {reason}")]
    Unreachable { destination: String, reason: String },

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("peer disconnected before replying")]
    Disconnected,

    #[error("no reply within {0:?}")]
    TimedOut(Duration),

    /// A reply arrived but could not be decoded or did not match the request.
    #[error("invalid reply: {0}")]
    InvalidReply(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&DeliveryFailure> for ErrorCode {
    fn from(failure: &DeliveryFailure) -> Self {
        match failure {
            DeliveryFailure::Unreachable { .. } => ErrorCode::BrokerNotAvailable,
            DeliveryFailure::ConnectionReset | DeliveryFailure::Disconnected => {
                ErrorCode::NetworkException
            }
            DeliveryFailure::TimedOut(_) => ErrorCode::RequestTimedOut,
            DeliveryFailure::InvalidReply(_) => ErrorCode::CorruptMessage,
            DeliveryFailure::Io(e) => code_for_io_kind(e.kind()),
            DeliveryFailure::Other(_) => ErrorCode::UnknownServerError,
        }
    }
}

fn code_for_io_kind(kind: io::ErrorKind) -> ErrorCode {
    match kind {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::NotConnected => ErrorCode::BrokerNotAvailable,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ErrorCode::NetworkException,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorCode::RequestTimedOut,
        _ => ErrorCode::UnknownServerError,
    }
}

impl DeliveryFailure {
    /// Classify a socket error raised while talking to `destination`.
    pub fn from_io(destination: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                DeliveryFailure::Unreachable {
                    destination: destination.to_string(),
                    reason: err.to_string(),
                }
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => DeliveryFailure::ConnectionReset,
            io::ErrorKind::UnexpectedEof => DeliveryFailure::Disconnected,
            _ => DeliveryFailure::Io(err),
        }
    }
}

/// Server-side counterpart: the code sent back when a request could not be
/// decoded or handled.
impl From<&WireError> for ErrorCode {
    fn from(err: &WireError) -> Self {
        match err {
            WireError::MalformedMessage(_) => ErrorCode::CorruptMessage,
            WireError::InvalidArgument(_) | WireError::SchemaMismatch(_) => {
                ErrorCode::InvalidRequest
            }
            WireError::UnsupportedVersion { .. } | WireError::UnknownApiKey(_) => {
                ErrorCode::UnsupportedVersion
            }
            WireError::Io(e) => code_for_io_kind(e.kind()),
        }
    }
}
