//! Error codes shared by every response in the protocol family.

use serde::Serialize;
use std::fmt;

/// Stable numeric failure codes carried in the `error_code` field of responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    UnknownServerError,
    None,
    CorruptMessage,
    RequestTimedOut,
    BrokerNotAvailable,
    NetworkException,
    CoordinatorLoadInProgress,
    CoordinatorNotAvailable,
    NotCoordinator,
    UnsupportedVersion,
    InvalidRequest,
    InvalidTransactionTimeout,
    ConcurrentTransactions,
    TransactionalIdAuthorizationFailed,
}

impl ErrorCode {
    pub fn code(self) -> i16 {
        match self {
            ErrorCode::UnknownServerError => -1,
            ErrorCode::None => 0,
            ErrorCode::CorruptMessage => 2,
            ErrorCode::RequestTimedOut => 7,
            ErrorCode::BrokerNotAvailable => 8,
            ErrorCode::NetworkException => 13,
            ErrorCode::CoordinatorLoadInProgress => 14,
            ErrorCode::CoordinatorNotAvailable => 15,
            ErrorCode::NotCoordinator => 16,
            ErrorCode::UnsupportedVersion => 35,
            ErrorCode::InvalidRequest => 42,
            ErrorCode::InvalidTransactionTimeout => 50,
            ErrorCode::ConcurrentTransactions => 51,
            ErrorCode::TransactionalIdAuthorizationFailed => 53,
        }
    }

    /// Map a wire value back to a code. Values this crate does not know are
    /// reported as `UnknownServerError` rather than rejected.
    pub fn from_code(code: i16) -> Self {
        match code {
            0 => ErrorCode::None,
            2 => ErrorCode::CorruptMessage,
            7 => ErrorCode::RequestTimedOut,
            8 => ErrorCode::BrokerNotAvailable,
            13 => ErrorCode::NetworkException,
            14 => ErrorCode::CoordinatorLoadInProgress,
            15 => ErrorCode::CoordinatorNotAvailable,
            16 => ErrorCode::NotCoordinator,
            35 => ErrorCode::UnsupportedVersion,
            42 => ErrorCode::InvalidRequest,
            50 => ErrorCode::InvalidTransactionTimeout,
            51 => ErrorCode::ConcurrentTransactions,
            53 => ErrorCode::TransactionalIdAuthorizationFailed,
            -1 => ErrorCode::UnknownServerError,
            other => {
                tracing::warn!(code = other, "unknown error code, treating as UnknownServerError");
                ErrorCode::UnknownServerError
            }
        }
    }

    pub fn is_none(self) -> bool {
        self == ErrorCode::None
    }

    /// Whether a client may retry the same request unchanged.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            ErrorCode::CorruptMessage
                | ErrorCode::RequestTimedOut
                | ErrorCode::NetworkException
                | ErrorCode::CoordinatorLoadInProgress
                | ErrorCode::CoordinatorNotAvailable
                | ErrorCode::NotCoordinator
                | ErrorCode::ConcurrentTransactions
        )
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::UnknownServerError => {
                "The server experienced an unexpected error when processing the request."
            }
            ErrorCode::None => "",
            ErrorCode::CorruptMessage => "The message could not be decoded or failed validation.",
            ErrorCode::RequestTimedOut => "The request timed out.",
            ErrorCode::BrokerNotAvailable => "The broker is not available.",
            ErrorCode::NetworkException => {
                "The server disconnected before a response was received."
            }
            ErrorCode::CoordinatorLoadInProgress => "The coordinator is loading and hence can't process requests.",
            ErrorCode::CoordinatorNotAvailable => "The coordinator is not available.",
            ErrorCode::NotCoordinator => "This is not the correct coordinator.",
            ErrorCode::UnsupportedVersion => "The version of API is not supported.",
            ErrorCode::InvalidRequest => "This most likely occurs because of a request being malformed by the client library.",
            ErrorCode::InvalidTransactionTimeout => {
                "The transaction timeout is larger than the maximum value allowed by the broker."
            }
            ErrorCode::ConcurrentTransactions => {
                "The producer attempted to update a transaction while another concurrent operation on the same transaction was ongoing."
            }
            ErrorCode::TransactionalIdAuthorizationFailed => {
                "Transactional Id authorization failed."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}
