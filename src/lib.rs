//! txnwire: versioned, schema-driven request/response encoding for
//! transactional producer-id negotiation (Kafka InitProducerId compatible).

pub mod client;
pub mod config;
pub mod error;
pub mod failure;
pub mod message;
pub mod observability;
pub mod protocol;
pub mod server;

pub use client::{Client, TcpTransport, Transport};
pub use config::{ClientConfig, ServerConfig};
pub use error::{Result, WireError};
pub use failure::DeliveryFailure;
pub use message::{
    ApiVersionsRequest, ApiVersionsRequestBuilder, ApiVersionsResponse, InitProducerIdRequest,
    InitProducerIdRequestBuilder, InitProducerIdResponse, ProtocolRequest, ProtocolResponse,
    RequestBuilder, TransactionTimeout, NO_TRANSACTION_TIMEOUT_MS,
};
pub use protocol::{ApiKey, ErrorCode, SchemaRegistry, StaticRegistry};
pub use server::RequestHandler;
