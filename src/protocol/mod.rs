//! Wire protocol: api keys, error codes, field layouts and the field codec.
//!
//! Frame: length (4 bytes BE) | request header | body.
//! Bodies are laid out by the [`SchemaRegistry`] entry for (api key, version).

mod api;
pub mod codec;
mod errors;
mod header;
mod schema;
pub mod types;

pub use api::ApiKey;
pub use codec::{
    decode_request, decode_response, encode_request, encode_request_frame, encode_response,
    encode_response_frame, FieldValue, Struct,
};
pub use errors::ErrorCode;
pub use header::{frame, split_frame, RequestHeader, ResponseHeader, MAX_FRAME_LEN};
pub use schema::{Field, FieldType, Schema, SchemaRegistry, StaticRegistry};
