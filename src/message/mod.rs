//! Message kinds and the capability traits every request/response pair implements.

mod api_versions;
mod init_producer_id;

pub use api_versions::{
    ApiVersion, ApiVersionsRequest, ApiVersionsRequestBuilder, ApiVersionsResponse,
};
pub use init_producer_id::{
    InitProducerIdRequest, InitProducerIdRequestBuilder, InitProducerIdResponse,
    TransactionTimeout, NO_PRODUCER_EPOCH, NO_PRODUCER_ID, NO_TRANSACTION_TIMEOUT_MS,
};

use crate::error::{Result, WireError};
use crate::failure::DeliveryFailure;
use crate::protocol::{ApiKey, ErrorCode, SchemaRegistry, StaticRegistry, Struct};

/// An immutable, versioned request.
pub trait ProtocolRequest: Sized + Send + Sync {
    const API_KEY: ApiKey;

    type Response: ProtocolResponse;

    /// Version selecting the layout used for every encode of this value.
    fn version(&self) -> i16;

    /// Logical values by slot.
    fn to_struct(&self) -> Struct;

    /// Trusted constructor used by the codec. Re-checks semantic invariants
    /// and reports violations as [`WireError::MalformedMessage`].
    fn from_struct(s: Struct, version: i16) -> Result<Self>;

    /// Response to hand back when no genuine reply can be obtained.
    fn error_response(&self, failure: &DeliveryFailure) -> Self::Response {
        Self::Response::from_error_code(ErrorCode::from(failure))
    }
}

/// A response. Every response carries an error code and can be synthesized
/// from one.
pub trait ProtocolResponse: Sized + Send + Sync {
    const API_KEY: ApiKey;

    fn to_struct(&self) -> Struct;

    fn from_struct(s: Struct) -> Result<Self>;

    fn error_code(&self) -> ErrorCode;

    fn from_error_code(code: ErrorCode) -> Self;
}

/// Validated staging object that yields requests for a chosen version.
pub trait RequestBuilder {
    type Request: ProtocolRequest;

    /// Produce a new request stamped with `version`, which `registry` must
    /// have a layout for. No I/O.
    fn build_for<S: SchemaRegistry + ?Sized>(
        &self,
        version: i16,
        registry: &S,
    ) -> Result<Self::Request>;

    /// [`RequestBuilder::build_for`] against the built-in layouts.
    fn build(&self, version: i16) -> Result<Self::Request> {
        self.build_for(version, &StaticRegistry)
    }
}

pub(crate) fn check_version<S: SchemaRegistry + ?Sized>(
    registry: &S,
    api: ApiKey,
    version: i16,
) -> Result<()> {
    if !registry.is_supported(api, version) {
        return Err(WireError::UnsupportedVersion {
            api: api.name().to_string(),
            version,
        });
    }
    Ok(())
}
