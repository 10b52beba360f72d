//! Inbound dispatch: decode a request frame, call the handler, encode the reply.

use crate::error::{Result, WireError};
use crate::message::{
    ApiVersionsRequest, ApiVersionsResponse, InitProducerIdRequest, InitProducerIdResponse,
    ProtocolRequest, ProtocolResponse,
};
use crate::observability::observability;
use crate::protocol::{
    decode_request, encode_response_frame, ApiKey, ErrorCode, RequestHeader, SchemaRegistry,
};
use bytes::BytesMut;
use tracing::{info, warn};

/// Business logic behind the listener. ApiVersions is answered from the
/// registry and never reaches the handler.
pub trait RequestHandler: Send + Sync + 'static {
    fn init_producer_id(&self, request: &InitProducerIdRequest) -> Result<InitProducerIdResponse>;
}

/// Handle one request frame (length prefix already removed) and return the
/// framed response.
///
/// `Err` means the frame cannot be answered at all (unreadable header,
/// unknown api key, unsupported version of an api other than ApiVersions);
/// the caller should drop the connection. Body decode failures and handler
/// errors are answered with an error response instead.
pub fn handle_frame<H, S>(handler: &H, registry: &S, frame: &[u8]) -> Result<BytesMut>
where
    H: RequestHandler + ?Sized,
    S: SchemaRegistry + ?Sized,
{
    let mut src = frame;
    let header = RequestHeader::read(&mut src)?;
    let api = header.api_key;

    if !registry.is_supported(api, header.api_version) {
        observability().record_inbound(false);
        if api == ApiKey::ApiVersions {
            // Old and new clients alike can read an ApiVersions v0 error.
            let mut response = ApiVersionsResponse::from_registry(registry);
            response.error_code = ErrorCode::UnsupportedVersion;
            return encode_response_frame(header.correlation_id, &response, 0, registry);
        }
        return Err(WireError::UnsupportedVersion {
            api: api.name().to_string(),
            version: header.api_version,
        });
    }

    info!(
        api = api.name(),
        version = header.api_version,
        correlation_id = header.correlation_id,
        client_id = header.client_id.as_deref().unwrap_or("-"),
        "inbound request"
    );
    match api {
        ApiKey::ApiVersions => serve::<ApiVersionsRequest, _, _>(&header, src, registry, |_| {
            Ok(ApiVersionsResponse::from_registry(registry))
        }),
        ApiKey::InitProducerId => serve::<InitProducerIdRequest, _, _>(
            &header,
            src,
            registry,
            |request| handler.init_producer_id(request),
        ),
    }
}

fn serve<R, S, F>(header: &RequestHeader, body: &[u8], registry: &S, f: F) -> Result<BytesMut>
where
    R: ProtocolRequest,
    S: SchemaRegistry + ?Sized,
    F: FnOnce(&R) -> Result<R::Response>,
{
    let outcome = decode_request::<R, _, _>(body, header.api_version, registry).and_then(|r| f(&r));
    let response = match outcome {
        Ok(response) => {
            observability().record_inbound(true);
            response
        }
        Err(e) => {
            observability().record_inbound(false);
            let code = ErrorCode::from(&e);
            warn!(api = R::API_KEY.name(), error = %e, error_code = %code, "request failed");
            R::Response::from_error_code(code)
        }
    };
    encode_response_frame(header.correlation_id, &response, header.api_version, registry)
}
