//! Client side of the request pipeline.
//!
//! `send` walks one attempt through Built → Encoded → Sent → AwaitingReply and
//! always ends in a response: the decoded reply, or one synthesized from the
//! [`DeliveryFailure`] that prevented it.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::failure::DeliveryFailure;
use crate::message::{ApiVersionsRequestBuilder, ProtocolRequest, ProtocolResponse, RequestBuilder};
use crate::observability::observability;
use crate::protocol::{
    decode_response, encode_request_frame, ApiKey, RequestHeader, ResponseHeader, SchemaRegistry,
    StaticRegistry, MAX_FRAME_LEN,
};
use bytes::Bytes;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Moves one encoded request to a destination and returns the reply frame
/// (without its length prefix). Implementations do not retry.
pub trait Transport: Send + Sync {
    fn round_trip(&self, destination: &str, frame: &[u8])
        -> std::result::Result<Bytes, DeliveryFailure>;
}

/// Blocking TCP transport: one connection per round trip.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

/// std sockets reject a zero timeout; zero means unbounded here.
fn bound(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

impl TcpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: bound(config.connect_timeout),
            request_timeout: bound(config.request_timeout),
        }
    }

    fn connect(&self, destination: &str) -> std::result::Result<TcpStream, DeliveryFailure> {
        let unreachable = |reason: String| DeliveryFailure::Unreachable {
            destination: destination.to_string(),
            reason,
        };
        let addrs = destination
            .to_socket_addrs()
            .map_err(|e| unreachable(format!("resolve failed: {}", e)))?;
        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(unreachable(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses".to_string()),
        ))
    }

    fn io_failure(&self, destination: &str, err: io::Error) -> DeliveryFailure {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                DeliveryFailure::TimedOut(self.request_timeout.unwrap_or_default())
            }
            _ => DeliveryFailure::from_io(destination, err),
        }
    }
}

impl Transport for TcpTransport {
    fn round_trip(
        &self,
        destination: &str,
        frame: &[u8],
    ) -> std::result::Result<Bytes, DeliveryFailure> {
        let mut stream = self.connect(destination)?;
        let fail = |e: io::Error| self.io_failure(destination, e);
        stream
            .set_read_timeout(self.request_timeout)
            .map_err(fail)?;
        stream
            .set_write_timeout(self.request_timeout)
            .map_err(fail)?;
        stream.write_all(frame).map_err(fail)?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).map_err(fail)?;
        let len = i32::from_be_bytes(len_buf);
        if len <= 0 || len as usize > MAX_FRAME_LEN {
            return Err(DeliveryFailure::InvalidReply(format!(
                "invalid reply frame size {}",
                len
            )));
        }
        let mut reply = vec![0u8; len as usize];
        stream.read_exact(&mut reply).map_err(fail)?;
        Ok(Bytes::from(reply))
    }
}

/// Request pipeline over a [`Transport`].
pub struct Client<T, S = StaticRegistry> {
    transport: T,
    registry: S,
    config: ClientConfig,
    next_correlation_id: AtomicI32,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self::with_registry(transport, StaticRegistry, config)
    }
}

impl<T: Transport, S: SchemaRegistry> Client<T, S> {
    pub fn with_registry(transport: T, registry: S, config: ClientConfig) -> Self {
        Self {
            transport,
            registry,
            config,
            next_correlation_id: AtomicI32::new(0),
        }
    }

    pub fn registry(&self) -> &S {
        &self.registry
    }

    /// Send `request` and return its response.
    ///
    /// `Err` is only returned when the request cannot be encoded (no layout
    /// for its version). Anything that goes wrong after encoding yields a
    /// synthesized response via [`ProtocolRequest::error_response`].
    pub fn send<R: ProtocolRequest>(&self, destination: &str, request: &R) -> Result<R::Response> {
        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let header = RequestHeader {
            api_key: R::API_KEY,
            api_version: request.version(),
            correlation_id,
            client_id: self.config.client_id.clone(),
        };
        let frame = encode_request_frame(&header, request, &self.registry)?;

        let span = tracing::debug_span!(
            "txnwire.request",
            api = R::API_KEY.name(),
            version = request.version(),
            correlation_id,
            destination
        );
        let _entered = span.enter();
        observability().record_sent(R::API_KEY);
        debug!(len = frame.len(), "sending request");

        let outcome = self
            .transport
            .round_trip(destination, &frame)
            .and_then(|reply| self.decode_reply::<R>(reply, request.version(), correlation_id));
        match outcome {
            Ok(response) => {
                observability().record_outcome(false);
                debug!(error_code = %response.error_code(), "response decoded");
                Ok(response)
            }
            Err(failure) => {
                observability().record_outcome(true);
                let response = request.error_response(&failure);
                warn!(
                    %failure,
                    error_code = %response.error_code(),
                    "request failed locally, synthesized response"
                );
                Ok(response)
            }
        }
    }

    fn decode_reply<R: ProtocolRequest>(
        &self,
        mut reply: Bytes,
        version: i16,
        correlation_id: i32,
    ) -> std::result::Result<R::Response, DeliveryFailure> {
        let invalid = |e: crate::error::WireError| DeliveryFailure::InvalidReply(e.to_string());
        let header = ResponseHeader::read(&mut reply, R::API_KEY, version).map_err(invalid)?;
        if header.correlation_id != correlation_id {
            return Err(DeliveryFailure::InvalidReply(format!(
                "correlation id mismatch: sent {}, received {}",
                correlation_id, header.correlation_id
            )));
        }
        decode_response::<R::Response, _, _>(reply, version, &self.registry).map_err(invalid)
    }

    /// Ask `destination` which versions it serves and pick the highest
    /// version of `api` both sides support. `None` if there is no overlap or
    /// the peer could not be asked.
    pub fn negotiate_version(&self, destination: &str, api: ApiKey) -> Result<Option<i16>> {
        let request = ApiVersionsRequestBuilder::new().build_for(0, &self.registry)?;
        let response = self.send(destination, &request)?;
        if !response.error_code.is_none() {
            warn!(destination, error_code = %response.error_code, "version negotiation failed");
            return Ok(None);
        }
        Ok(response.negotiate(api, &self.registry))
    }
}
