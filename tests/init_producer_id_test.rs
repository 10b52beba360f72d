//! InitProducerId builder, envelope and codec behaviour.

use txnwire::protocol::{decode_request, encode_request};
use txnwire::{
    InitProducerIdRequest, InitProducerIdRequestBuilder, ProtocolRequest, RequestBuilder,
    StaticRegistry, TransactionTimeout, WireError, NO_TRANSACTION_TIMEOUT_MS,
};
use std::time::Duration;

const VERSIONS: [i16; 3] = [0, 1, 2];

fn round_trip(request: &InitProducerIdRequest) -> InitProducerIdRequest {
    let bytes = encode_request(request, &StaticRegistry).unwrap();
    decode_request(bytes, request.version(), &StaticRegistry).unwrap()
}

#[test]
fn valid_arguments_build_and_round_trip_for_every_version() {
    let cases: [(Option<&str>, i32); 5] = [
        (None, 1),
        (Some("a"), 1),
        (Some("txn-42"), 30_000),
        (Some("ünïcödé-id"), 60_000),
        (None, NO_TRANSACTION_TIMEOUT_MS),
    ];
    for (id, timeout) in cases {
        let builder = InitProducerIdRequestBuilder::with_timeout(id, timeout).unwrap();
        for version in VERSIONS {
            let request = builder.build(version).unwrap();
            assert_eq!(request.version(), version);
            let decoded = round_trip(&request);
            assert_eq!(decoded, request);
            assert_eq!(decoded.transactional_id(), id);
            assert_eq!(decoded.transaction_timeout_ms(), timeout);
        }
    }
}

#[test]
fn non_positive_timeout_is_rejected() {
    for id in [None, Some("txn"), Some("")] {
        for timeout in [0, -5, i32::MIN] {
            let err = InitProducerIdRequestBuilder::with_timeout(id, timeout).unwrap_err();
            assert!(matches!(err, WireError::InvalidArgument(_)), "{:?}", err);
        }
    }
}

#[test]
fn timeout_error_names_the_offending_value() {
    let err = InitProducerIdRequestBuilder::with_timeout(Some("txn"), -5).unwrap_err();
    assert!(err.to_string().contains("-5"), "{}", err);
}

#[test]
fn empty_transactional_id_is_rejected_but_none_is_accepted() {
    let err = InitProducerIdRequestBuilder::with_timeout(Some(""), 1000).unwrap_err();
    assert!(matches!(err, WireError::InvalidArgument(_)));

    let request = InitProducerIdRequestBuilder::with_timeout(None, 1000)
        .unwrap()
        .build(1)
        .unwrap();
    assert_eq!(request.transactional_id(), None);
    assert_eq!(request.transaction_timeout_ms(), 1000);
}

#[test]
fn unsupported_version_is_rejected_at_build() {
    let builder = InitProducerIdRequestBuilder::new(Some("txn")).unwrap();
    for version in [-1, 3, 99] {
        let err = builder.build(version).unwrap_err();
        assert!(
            matches!(err, WireError::UnsupportedVersion { version: v, .. } if v == version),
            "{:?}",
            err
        );
    }
}

#[test]
fn build_produces_independent_envelopes() {
    let builder = InitProducerIdRequestBuilder::with_timeout(Some("txn-7"), 500).unwrap();
    let v0 = builder.build(0).unwrap();
    let v2 = builder.build(2).unwrap();
    drop(builder);
    assert_eq!(v0.transactional_id(), Some("txn-7"));
    assert_eq!(v2.transactional_id(), Some("txn-7"));
    assert_eq!(v0.version(), 0);
    assert_eq!(v2.version(), 2);
    assert_ne!(v0, v2);
}

#[test]
fn decoding_zero_timeout_is_malformed() {
    // v0 layout: null transactional id, timeout 0.
    let body: &[u8] = &[0xff, 0xff, 0x00, 0x00, 0x00, 0x00];
    let err = decode_request::<InitProducerIdRequest, _, _>(body, 0, &StaticRegistry).unwrap_err();
    assert!(matches!(err, WireError::MalformedMessage(_)), "{:?}", err);
}

#[test]
fn decoding_negative_timeout_is_malformed() {
    let mut body = vec![0x00, 0x01, b'x'];
    body.extend_from_slice(&(-1i32).to_be_bytes());
    let err =
        decode_request::<InitProducerIdRequest, _, _>(&body[..], 1, &StaticRegistry).unwrap_err();
    assert!(matches!(err, WireError::MalformedMessage(_)), "{:?}", err);
}

#[test]
fn decoding_empty_transactional_id_is_malformed() {
    let mut body = vec![0x00, 0x00];
    body.extend_from_slice(&1000i32.to_be_bytes());
    let err =
        decode_request::<InitProducerIdRequest, _, _>(&body[..], 0, &StaticRegistry).unwrap_err();
    assert!(matches!(err, WireError::MalformedMessage(_)), "{:?}", err);
}

#[test]
fn end_to_end_txn_42() {
    let request = InitProducerIdRequestBuilder::with_timeout(Some("txn-42"), 30_000)
        .unwrap()
        .build(1)
        .unwrap();
    let decoded = round_trip(&request);
    assert_eq!(decoded.transactional_id(), Some("txn-42"));
    assert_eq!(decoded.transaction_timeout_ms(), 30_000);
}

#[test]
fn default_builder_round_trips_to_no_timeout() {
    let request = InitProducerIdRequestBuilder::new(None)
        .unwrap()
        .build(1)
        .unwrap();
    let decoded = round_trip(&request);
    assert_eq!(decoded.transactional_id(), None);
    assert_eq!(decoded.transaction_timeout_ms(), i32::MAX);
    assert_eq!(decoded.transaction_timeout(), TransactionTimeout::Unbounded);
}

#[test]
fn explicit_timeout_api_maps_to_wire_values() {
    let bounded = InitProducerIdRequestBuilder::with_transaction_timeout(
        Some("txn"),
        TransactionTimeout::Bounded(Duration::from_secs(60)),
    )
    .unwrap()
    .build(0)
    .unwrap();
    assert_eq!(bounded.transaction_timeout_ms(), 60_000);
    assert_eq!(
        bounded.transaction_timeout(),
        TransactionTimeout::Bounded(Duration::from_secs(60))
    );

    let unbounded =
        InitProducerIdRequestBuilder::with_transaction_timeout(None, TransactionTimeout::Unbounded)
            .unwrap()
            .build(0)
            .unwrap();
    assert_eq!(unbounded.transaction_timeout_ms(), NO_TRANSACTION_TIMEOUT_MS);

    let zero = InitProducerIdRequestBuilder::with_transaction_timeout(
        None,
        TransactionTimeout::Bounded(Duration::ZERO),
    );
    assert!(matches!(zero, Err(WireError::InvalidArgument(_))));

    let too_long = InitProducerIdRequestBuilder::with_transaction_timeout(
        None,
        TransactionTimeout::Bounded(Duration::from_secs(u64::from(u32::MAX))),
    );
    assert!(matches!(too_long, Err(WireError::InvalidArgument(_))));
}

#[test]
fn envelopes_are_shareable_across_threads() {
    let request = std::sync::Arc::new(
        InitProducerIdRequestBuilder::with_timeout(Some("shared"), 1234)
            .unwrap()
            .build(2)
            .unwrap(),
    );
    let expected = encode_request(request.as_ref(), &StaticRegistry).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let request = std::sync::Arc::clone(&request);
            std::thread::spawn(move || encode_request(request.as_ref(), &StaticRegistry).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn bounded_timeout_must_read_back_unchanged() {
    let at_sentinel = InitProducerIdRequestBuilder::with_transaction_timeout(
        Some("txn"),
        TransactionTimeout::Bounded(Duration::from_millis(NO_TRANSACTION_TIMEOUT_MS as u64)),
    );
    assert!(matches!(at_sentinel, Err(WireError::InvalidArgument(_))));

    let fractional = InitProducerIdRequestBuilder::with_transaction_timeout(
        Some("txn"),
        TransactionTimeout::Bounded(Duration::from_micros(1_900)),
    );
    assert!(matches!(fractional, Err(WireError::InvalidArgument(_))));

    let largest = TransactionTimeout::Bounded(Duration::from_millis(
        (NO_TRANSACTION_TIMEOUT_MS - 1) as u64,
    ));
    let request = InitProducerIdRequestBuilder::with_transaction_timeout(Some("txn"), largest)
        .unwrap()
        .build(2)
        .unwrap();
    assert_eq!(round_trip(&request).transaction_timeout(), largest);
}
