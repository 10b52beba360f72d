//! InitProducerId: a producer asks the transaction coordinator for a producer
//! id and epoch, optionally binding them to a transactional id.

use crate::error::{Result, WireError};
use crate::message::{check_version, ProtocolRequest, ProtocolResponse, RequestBuilder};
use crate::protocol::{ApiKey, ErrorCode, FieldValue, SchemaRegistry, Struct};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Wire sentinel for "no transaction timeout bound".
pub const NO_TRANSACTION_TIMEOUT_MS: i32 = i32::MAX;
pub const NO_PRODUCER_ID: i64 = -1;
pub const NO_PRODUCER_EPOCH: i16 = -1;

const TRANSACTIONAL_ID: usize = 0;
const TRANSACTION_TIMEOUT_MS: usize = 1;

const THROTTLE_TIME_MS: usize = 0;
const ERROR_CODE: usize = 1;
const PRODUCER_ID: usize = 2;
const PRODUCER_EPOCH: usize = 3;

/// Transaction timeout as seen by callers. On the wire `Unbounded` is
/// [`NO_TRANSACTION_TIMEOUT_MS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionTimeout {
    Bounded(Duration),
    Unbounded,
}

impl TransactionTimeout {
    fn from_wire(ms: i32) -> Self {
        if ms == NO_TRANSACTION_TIMEOUT_MS {
            TransactionTimeout::Unbounded
        } else {
            TransactionTimeout::Bounded(Duration::from_millis(ms.max(0) as u64))
        }
    }

    /// `Bounded` must be a whole number of milliseconds below the sentinel,
    /// so that it reads back unchanged.
    fn to_wire(self) -> Result<i32> {
        let d = match self {
            TransactionTimeout::Unbounded => return Ok(NO_TRANSACTION_TIMEOUT_MS),
            TransactionTimeout::Bounded(d) => d,
        };
        if d.subsec_nanos() % 1_000_000 != 0 {
            return Err(WireError::InvalidArgument(format!(
                "transaction timeout {:?} is not a whole number of milliseconds",
                d
            )));
        }
        match i32::try_from(d.as_millis()) {
            Ok(ms) if ms != NO_TRANSACTION_TIMEOUT_MS => Ok(ms),
            _ => Err(WireError::InvalidArgument(format!(
                "transaction timeout {:?} must be below {} ms; use Unbounded for no bound",
                d, NO_TRANSACTION_TIMEOUT_MS
            ))),
        }
    }
}

fn validate(
    transactional_id: Option<&str>,
    transaction_timeout_ms: i32,
    reject: fn(String) -> WireError,
) -> Result<()> {
    if transaction_timeout_ms <= 0 {
        return Err(reject(format!(
            "transaction timeout value is not positive: {}",
            transaction_timeout_ms
        )));
    }
    if transactional_id.is_some_and(str::is_empty) {
        return Err(reject(
            "must set either a null or a non-empty transactional id".to_string(),
        ));
    }
    Ok(())
}

/// Builder for [`InitProducerIdRequest`]. Arguments are checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitProducerIdRequestBuilder {
    transactional_id: Option<String>,
    transaction_timeout_ms: i32,
}

impl InitProducerIdRequestBuilder {
    /// Builder with no transaction timeout bound.
    pub fn new(transactional_id: Option<&str>) -> Result<Self> {
        Self::with_timeout(transactional_id, NO_TRANSACTION_TIMEOUT_MS)
    }

    /// Fails with [`WireError::InvalidArgument`] if the timeout is not
    /// positive or the transactional id is `Some("")`.
    pub fn with_timeout(transactional_id: Option<&str>, transaction_timeout_ms: i32) -> Result<Self> {
        validate(
            transactional_id,
            transaction_timeout_ms,
            WireError::InvalidArgument,
        )?;
        Ok(Self {
            transactional_id: transactional_id.map(str::to_string),
            transaction_timeout_ms,
        })
    }

    pub fn with_transaction_timeout(
        transactional_id: Option<&str>,
        timeout: TransactionTimeout,
    ) -> Result<Self> {
        Self::with_timeout(transactional_id, timeout.to_wire()?)
    }
}

impl RequestBuilder for InitProducerIdRequestBuilder {
    type Request = InitProducerIdRequest;

    fn build_for<S: SchemaRegistry + ?Sized>(
        &self,
        version: i16,
        registry: &S,
    ) -> Result<InitProducerIdRequest> {
        check_version(registry, ApiKey::InitProducerId, version)?;
        Ok(InitProducerIdRequest {
            version,
            transactional_id: self.transactional_id.clone(),
            transaction_timeout_ms: self.transaction_timeout_ms,
        })
    }
}

impl fmt::Display for InitProducerIdRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(type=InitProducerIdRequest, transactional_id={:?}, transaction_timeout_ms={})",
            self.transactional_id, self.transaction_timeout_ms
        )
    }
}

/// Request for a producer id. Immutable once built or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitProducerIdRequest {
    version: i16,
    transactional_id: Option<String>,
    transaction_timeout_ms: i32,
}

impl InitProducerIdRequest {
    pub fn transactional_id(&self) -> Option<&str> {
        self.transactional_id.as_deref()
    }

    /// Raw wire value; [`NO_TRANSACTION_TIMEOUT_MS`] when unbounded.
    pub fn transaction_timeout_ms(&self) -> i32 {
        self.transaction_timeout_ms
    }

    pub fn transaction_timeout(&self) -> TransactionTimeout {
        TransactionTimeout::from_wire(self.transaction_timeout_ms)
    }
}

impl ProtocolRequest for InitProducerIdRequest {
    const API_KEY: ApiKey = ApiKey::InitProducerId;

    type Response = InitProducerIdResponse;

    fn version(&self) -> i16 {
        self.version
    }

    fn to_struct(&self) -> Struct {
        Struct::new(vec![
            FieldValue::String(self.transactional_id.clone()),
            FieldValue::Int32(self.transaction_timeout_ms),
        ])
    }

    fn from_struct(mut s: Struct, version: i16) -> Result<Self> {
        let transactional_id = s.take_string(TRANSACTIONAL_ID)?;
        let transaction_timeout_ms = s.int32(TRANSACTION_TIMEOUT_MS)?;
        validate(
            transactional_id.as_deref(),
            transaction_timeout_ms,
            WireError::MalformedMessage,
        )?;
        Ok(Self {
            version,
            transactional_id,
            transaction_timeout_ms,
        })
    }
}

/// Producer id assignment, or an error code with the id fields unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitProducerIdResponse {
    pub throttle_time_ms: i32,
    pub error_code: ErrorCode,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl InitProducerIdResponse {
    pub fn new(producer_id: i64, producer_epoch: i16) -> Self {
        Self {
            throttle_time_ms: 0,
            error_code: ErrorCode::None,
            producer_id,
            producer_epoch,
        }
    }
}

impl ProtocolResponse for InitProducerIdResponse {
    const API_KEY: ApiKey = ApiKey::InitProducerId;

    fn to_struct(&self) -> Struct {
        Struct::new(vec![
            FieldValue::Int32(self.throttle_time_ms),
            FieldValue::Int16(self.error_code.code()),
            FieldValue::Int64(self.producer_id),
            FieldValue::Int16(self.producer_epoch),
        ])
    }

    fn from_struct(s: Struct) -> Result<Self> {
        Ok(Self {
            throttle_time_ms: s.int32(THROTTLE_TIME_MS)?,
            error_code: ErrorCode::from_code(s.int16(ERROR_CODE)?),
            producer_id: s.int64(PRODUCER_ID)?,
            producer_epoch: s.int16(PRODUCER_EPOCH)?,
        })
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    fn from_error_code(code: ErrorCode) -> Self {
        Self {
            throttle_time_ms: 0,
            error_code: code,
            producer_id: NO_PRODUCER_ID,
            producer_epoch: NO_PRODUCER_EPOCH,
        }
    }
}
