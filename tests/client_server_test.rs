//! Client pipeline against a live listener and against scripted transports.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use txnwire::protocol::{
    decode_response, encode_response_frame, split_frame, RequestHeader, ResponseHeader, Schema,
};
use txnwire::server::{
    handle_frame, run_server, run_server_on_listener, run_server_on_listener_with_registry,
};
use txnwire::{
    ApiKey, ApiVersionsResponse, Client, ClientConfig, DeliveryFailure, ErrorCode,
    InitProducerIdRequest, InitProducerIdRequestBuilder, InitProducerIdResponse, ProtocolRequest,
    ProtocolResponse, RequestBuilder, RequestHandler, SchemaRegistry, ServerConfig, StaticRegistry,
    TcpTransport, Transport, WireError,
};

const PRODUCER_ID: i64 = 4000;

struct Coordinator;

impl RequestHandler for Coordinator {
    fn init_producer_id(&self, request: &InitProducerIdRequest) -> txnwire::Result<InitProducerIdResponse> {
        match request.transactional_id() {
            Some("forbidden") => Ok(InitProducerIdResponse::from_error_code(
                ErrorCode::TransactionalIdAuthorizationFailed,
            )),
            Some("broken") => Err(WireError::InvalidArgument("coordinator refused".into())),
            _ => Ok(InitProducerIdResponse::new(PRODUCER_ID, 0)),
        }
    }
}

fn test_config() -> ClientConfig {
    ClientConfig {
        client_id: Some("client-server-test".into()),
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(5),
    }
}

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = run_server_on_listener(Arc::new(Coordinator), listener).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn init_producer_id_round_trip_for_every_version() {
    let addr = start_server().await;
    let responses = tokio::task::spawn_blocking(move || {
        let config = test_config();
        let client = Client::new(TcpTransport::new(&config), config);
        let builder = InitProducerIdRequestBuilder::with_timeout(Some("txn-42"), 30_000).unwrap();
        (0..=2)
            .map(|version| {
                let request = builder.build(version).unwrap();
                client.send(&addr, &request).unwrap()
            })
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    assert_eq!(responses.len(), 3);
    for response in responses {
        assert_eq!(response.error_code, ErrorCode::None);
        assert_eq!(response.producer_id, PRODUCER_ID);
        assert_eq!(response.producer_epoch, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn negotiates_highest_common_version() {
    let addr = start_server().await;
    let version = tokio::task::spawn_blocking(move || {
        let config = test_config();
        let client = Client::new(TcpTransport::new(&config), config);
        client
            .negotiate_version(&addr, ApiKey::InitProducerId)
            .unwrap()
    })
    .await
    .unwrap();
    assert_eq!(version, Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_server_binds_configured_address() {
    let listen_addr = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().to_string()
    };
    let config = ServerConfig {
        listen_addr: listen_addr.clone(),
    };
    let server = tokio::spawn(async move { run_server(Arc::new(Coordinator), &config).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = tokio::task::spawn_blocking(move || {
        let config = test_config();
        let client = Client::new(TcpTransport::new(&config), config);
        let request = InitProducerIdRequestBuilder::new(None).unwrap().build(0).unwrap();
        client.send(&listen_addr, &request).unwrap()
    })
    .await
    .unwrap();
    assert_eq!(response.producer_id, PRODUCER_ID);
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_outcomes_reach_the_client_as_error_codes() {
    let addr = start_server().await;
    let (forbidden, broken) = tokio::task::spawn_blocking(move || {
        let config = test_config();
        let client = Client::new(TcpTransport::new(&config), config);
        let forbidden = InitProducerIdRequestBuilder::new(Some("forbidden"))
            .unwrap()
            .build(1)
            .unwrap();
        let broken = InitProducerIdRequestBuilder::new(Some("broken"))
            .unwrap()
            .build(2)
            .unwrap();
        (
            client.send(&addr, &forbidden).unwrap(),
            client.send(&addr, &broken).unwrap(),
        )
    })
    .await
    .unwrap();

    assert_eq!(forbidden.error_code, ErrorCode::TransactionalIdAuthorizationFailed);
    assert_eq!(forbidden.producer_id, -1);
    assert_eq!(broken.error_code, ErrorCode::InvalidRequest);
    assert_eq!(broken.producer_epoch, -1);
}

#[test]
fn unreachable_destination_yields_synthesized_response() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let config = test_config();
    let client = Client::new(TcpTransport::new(&config), config);
    let request = InitProducerIdRequestBuilder::new(Some("txn"))
        .unwrap()
        .build(1)
        .unwrap();

    let response = client.send(&addr, &request).unwrap();
    assert_eq!(response.error_code, ErrorCode::BrokerNotAvailable);
    assert_eq!(response.producer_id, -1);
    assert_eq!(response.producer_epoch, -1);
}

/// Replies with a fixed frame body regardless of the request.
struct ScriptedTransport(Bytes);

impl Transport for ScriptedTransport {
    fn round_trip(&self, _destination: &str, _frame: &[u8]) -> Result<Bytes, DeliveryFailure> {
        Ok(self.0.clone())
    }
}

struct FailingTransport;

impl Transport for FailingTransport {
    fn round_trip(&self, _destination: &str, _frame: &[u8]) -> Result<Bytes, DeliveryFailure> {
        Err(DeliveryFailure::TimedOut(Duration::from_secs(30)))
    }
}

fn reply_body(correlation_id: i32, version: i16) -> Bytes {
    let response = InitProducerIdResponse::new(7, 3);
    let mut framed = encode_response_frame(correlation_id, &response, version, &StaticRegistry).unwrap();
    split_frame(&mut framed).unwrap().unwrap().freeze()
}

#[test]
fn scripted_reply_is_decoded() {
    // The first request sent by a fresh client carries correlation id 0.
    let client = Client::new(ScriptedTransport(reply_body(0, 2)), test_config());
    let request = InitProducerIdRequestBuilder::new(None).unwrap().build(2).unwrap();
    let response = client.send("scripted", &request).unwrap();
    assert_eq!(response, InitProducerIdResponse::new(7, 3));
}

#[test]
fn correlation_mismatch_is_a_corrupt_reply() {
    let client = Client::new(ScriptedTransport(reply_body(99, 1)), test_config());
    let request = InitProducerIdRequestBuilder::new(None).unwrap().build(1).unwrap();
    let response = client.send("scripted", &request).unwrap();
    assert_eq!(response.error_code, ErrorCode::CorruptMessage);
    assert_eq!(response.producer_id, -1);
}

#[test]
fn garbage_reply_is_a_corrupt_reply() {
    let client = Client::new(
        ScriptedTransport(Bytes::from_static(&[0, 0, 0, 0, 0xde, 0xad])),
        test_config(),
    );
    let request = InitProducerIdRequestBuilder::new(None).unwrap().build(0).unwrap();
    let response = client.send("scripted", &request).unwrap();
    assert_eq!(response.error_code, ErrorCode::CorruptMessage);
}

#[test]
fn transport_timeout_is_reported_as_timed_out() {
    let client = Client::new(FailingTransport, test_config());
    let request = InitProducerIdRequestBuilder::new(Some("txn")).unwrap().build(0).unwrap();
    let response = client.send("nowhere", &request).unwrap();
    assert_eq!(response.error_code, ErrorCode::RequestTimedOut);
    assert_eq!(response.producer_epoch, -1);

    assert_eq!(client.negotiate_version("nowhere", ApiKey::InitProducerId).unwrap(), None);
}

fn request_frame(api_key: ApiKey, api_version: i16, body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    RequestHeader {
        api_key,
        api_version,
        correlation_id: 11,
        client_id: None,
    }
    .write(&mut buf)
    .unwrap();
    buf.extend_from_slice(body);
    buf.to_vec()
}

fn unframe(mut framed: BytesMut, api_key: ApiKey, version: i16) -> Bytes {
    let mut body = split_frame(&mut framed).unwrap().unwrap().freeze();
    let header = ResponseHeader::read(&mut body, api_key, version).unwrap();
    assert_eq!(header.correlation_id, 11);
    body
}

#[test]
fn malformed_body_is_answered_with_corrupt_message() {
    let frame = request_frame(ApiKey::InitProducerId, 0, &[0xff]);
    let reply = handle_frame(&Coordinator, &StaticRegistry, &frame).unwrap();
    let body = unframe(reply, ApiKey::InitProducerId, 0);
    let response: InitProducerIdResponse = decode_response(body, 0, &StaticRegistry).unwrap();
    assert_eq!(response.error_code(), ErrorCode::CorruptMessage);
    assert_eq!(response.producer_id, -1);
}

#[test]
fn unsupported_api_versions_version_gets_v0_error_with_ranges() {
    let frame = request_frame(ApiKey::ApiVersions, 7, &[]);
    let reply = handle_frame(&Coordinator, &StaticRegistry, &frame).unwrap();
    let body = unframe(reply, ApiKey::ApiVersions, 0);
    let response: ApiVersionsResponse = decode_response(body, 0, &StaticRegistry).unwrap();
    assert_eq!(response.error_code, ErrorCode::UnsupportedVersion);
    let range = response.find(ApiKey::InitProducerId).unwrap();
    assert_eq!((range.min_version, range.max_version), (0, 2));
}

#[test]
fn unsupported_init_producer_id_version_drops_the_frame() {
    let frame = request_frame(ApiKey::InitProducerId, 5, &[]);
    let err = handle_frame(&Coordinator, &StaticRegistry, &frame).unwrap_err();
    assert!(matches!(err, WireError::UnsupportedVersion { version: 5, .. }), "{:?}", err);
}

static BUILT_IN: StaticRegistry = StaticRegistry;

/// Serves InitProducerId v3 with the v2 layout, a version the built-in
/// registry does not know.
struct ExtendedRegistry;

impl ExtendedRegistry {
    fn layout_version(api: ApiKey, version: i16) -> i16 {
        if api == ApiKey::InitProducerId && version == 3 {
            2
        } else {
            version
        }
    }
}

impl SchemaRegistry for ExtendedRegistry {
    fn request_schema(&self, api: ApiKey, version: i16) -> txnwire::Result<&Schema> {
        BUILT_IN.request_schema(api, Self::layout_version(api, version))
    }

    fn response_schema(&self, api: ApiKey, version: i16) -> txnwire::Result<&Schema> {
        BUILT_IN.response_schema(api, Self::layout_version(api, version))
    }

    fn supported_versions(&self, api: ApiKey) -> Option<(i16, i16)> {
        match api {
            ApiKey::InitProducerId => Some((0, 3)),
            ApiKey::ApiVersions => BUILT_IN.supported_versions(api),
        }
    }
}

#[test]
fn builder_checks_the_registry_it_is_given() {
    let builder = InitProducerIdRequestBuilder::new(Some("t")).unwrap();
    let request = builder.build_for(3, &ExtendedRegistry).unwrap();
    assert_eq!(request.version(), 3);
    assert!(matches!(
        builder.build(3),
        Err(WireError::UnsupportedVersion { version: 3, .. })
    ));
    assert!(matches!(
        builder.build_for(4, &ExtendedRegistry),
        Err(WireError::UnsupportedVersion { version: 4, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn custom_registry_is_used_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = run_server_on_listener_with_registry(
            Arc::new(Coordinator),
            Arc::new(ExtendedRegistry),
            listener,
        )
        .await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (version, response) = tokio::task::spawn_blocking(move || {
        let config = test_config();
        let client = Client::with_registry(TcpTransport::new(&config), ExtendedRegistry, config);
        let version = client
            .negotiate_version(&addr, ApiKey::InitProducerId)
            .unwrap()
            .unwrap();
        let request = InitProducerIdRequestBuilder::with_timeout(Some("txn-v3"), 1_000)
            .unwrap()
            .build_for(version, client.registry())
            .unwrap();
        (version, client.send(&addr, &request).unwrap())
    })
    .await
    .unwrap();

    assert_eq!(version, 3);
    assert_eq!(response.error_code, ErrorCode::None);
    assert_eq!(response.producer_id, PRODUCER_ID);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_timeouts_mean_unbounded() {
    let addr = start_server().await;
    let response = tokio::task::spawn_blocking(move || {
        let config = ClientConfig {
            client_id: None,
            connect_timeout: Duration::ZERO,
            request_timeout: Duration::ZERO,
        };
        let client = Client::new(TcpTransport::new(&config), config);
        let request = InitProducerIdRequestBuilder::new(Some("txn")).unwrap().build(1).unwrap();
        client.send(&addr, &request).unwrap()
    })
    .await
    .unwrap();
    assert_eq!(response.error_code, ErrorCode::None);
    assert_eq!(response.producer_id, PRODUCER_ID);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_frame_closes_the_connection() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = start_server().await;
    let mut stream = tokio::net::TcpStream::connect(&addr).await.unwrap();
    let declared = (txnwire::protocol::MAX_FRAME_LEN as i32) + 1;
    stream.write_all(&declared.to_be_bytes()).await.unwrap();
    stream.write_all(&[0u8; 16]).await.unwrap();

    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .unwrap();
    // Closed without a reply: EOF, or a reset if unread bytes were pending.
    assert!(matches!(read, Ok(0) | Err(_)), "{:?}", read);
}
