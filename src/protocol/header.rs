//! Request/response headers and length-prefixed framing.
//!
//! Frame: int32 (BE) length + header + body.
//! Request header v1: api_key, api_version, correlation_id, client_id (nullable string).
//! Request header v2: v1 + tagged fields.
//! Response header v0: correlation_id. v1: + tagged fields.

use crate::error::{Result, WireError};
use crate::protocol::api::ApiKey;
use crate::protocol::types::{
    read_i16, read_i32, read_nullable_string, skip_tagged_fields, write_empty_tagged_fields,
    write_nullable_string,
};
use bytes::{Buf, BufMut, BytesMut};

/// Upper bound on a single frame.
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl RequestHeader {
    pub fn write(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i16(self.api_key.id());
        dst.put_i16(self.api_version);
        dst.put_i32(self.correlation_id);
        write_nullable_string(dst, self.client_id.as_deref())?;
        if self.api_key.request_header_version(self.api_version) >= 2 {
            write_empty_tagged_fields(dst);
        }
        Ok(())
    }

    /// Read a header. An unknown api key is reported as
    /// [`WireError::UnknownApiKey`] after the fixed prefix has been consumed.
    pub fn read<B: Buf>(src: &mut B) -> Result<Self> {
        let raw_key = read_i16(src)?;
        let api_version = read_i16(src)?;
        let correlation_id = read_i32(src)?;
        let client_id = read_nullable_string(src)?;
        let api_key = ApiKey::from_id(raw_key)?;
        if api_key.request_header_version(api_version) >= 2 {
            skip_tagged_fields(src)?;
        }
        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl ResponseHeader {
    pub fn write(&self, dst: &mut BytesMut, api_key: ApiKey, api_version: i16) {
        dst.put_i32(self.correlation_id);
        if api_key.response_header_version(api_version) >= 1 {
            write_empty_tagged_fields(dst);
        }
    }

    pub fn read<B: Buf>(src: &mut B, api_key: ApiKey, api_version: i16) -> Result<Self> {
        let correlation_id = read_i32(src)?;
        if api_key.response_header_version(api_version) >= 1 {
            skip_tagged_fields(src)?;
        }
        Ok(Self { correlation_id })
    }
}

/// Prepend 4-byte frame length (BE).
pub fn frame(body: &[u8]) -> Result<BytesMut> {
    if body.len() > MAX_FRAME_LEN {
        return Err(WireError::InvalidArgument(format!(
            "frame of {} bytes exceeds limit {}",
            body.len(),
            MAX_FRAME_LEN
        )));
    }
    let mut out = BytesMut::with_capacity(4 + body.len());
    out.put_i32(body.len() as i32);
    out.extend_from_slice(body);
    Ok(out)
}

/// Split the next complete frame (without its length prefix) off `src`.
/// Returns `None` when more bytes are needed.
pub fn split_frame(src: &mut BytesMut) -> Result<Option<BytesMut>> {
    if src.len() < 4 {
        return Ok(None);
    }
    let len = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
    if len <= 0 || len as usize > MAX_FRAME_LEN {
        return Err(WireError::malformed(format!("invalid frame size {}", len)));
    }
    let len = len as usize;
    if src.len() < 4 + len {
        return Ok(None);
    }
    src.advance(4);
    Ok(Some(src.split_to(len)))
}
