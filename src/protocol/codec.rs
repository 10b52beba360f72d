//! Field codec: writes and reads message values against a registry layout.
//!
//! Messages hand the codec a [`Struct`] holding their logical values by slot.
//! The codec walks the layout chosen for the version and writes (or reads)
//! exactly the slots it declares, in declared order. Layouts for different
//! versions may declare different slots; messages never branch on version.

use crate::error::{Result, WireError};
use crate::message::{ProtocolRequest, ProtocolResponse};
use crate::protocol::header::{frame, RequestHeader, ResponseHeader};
use crate::protocol::schema::{FieldType, Schema, SchemaRegistry};
use crate::protocol::types::{
    read_array_len, read_compact_array_len, read_compact_nullable_string, read_i16, read_i32,
    read_i64, read_nullable_string, skip_tagged_fields, write_compact_nullable_string,
    write_empty_tagged_fields, write_nullable_string, write_unsigned_varint,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A single logical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(Option<String>),
    Array(Option<Vec<Struct>>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int16(_) => "int16",
            FieldValue::Int32(_) => "int32",
            FieldValue::Int64(_) => "int64",
            FieldValue::String(_) => "string",
            FieldValue::Array(_) => "array",
        }
    }
}

/// Intermediate representation of a message: logical values indexed by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Struct {
    values: Vec<Option<FieldValue>>,
}

impl Struct {
    /// Build a struct with every slot populated, in slot order.
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    fn with_slots(n: usize) -> Self {
        Self {
            values: vec![None; n],
        }
    }

    fn set(&mut self, slot: usize, value: FieldValue) {
        if self.values.len() <= slot {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = Some(value);
    }

    fn get(&self, slot: usize) -> Option<&FieldValue> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    fn take(&mut self, slot: usize) -> Option<FieldValue> {
        self.values.get_mut(slot).and_then(Option::take)
    }

    fn missing(slot: usize) -> WireError {
        WireError::SchemaMismatch(format!("slot {} is not present", slot))
    }

    fn wrong_type(slot: usize, want: &str, got: &FieldValue) -> WireError {
        WireError::SchemaMismatch(format!(
            "slot {} holds {}, expected {}",
            slot,
            got.kind(),
            want
        ))
    }

    pub fn int16(&self, slot: usize) -> Result<i16> {
        match self.get(slot) {
            Some(FieldValue::Int16(v)) => Ok(*v),
            Some(other) => Err(Self::wrong_type(slot, "int16", other)),
            None => Err(Self::missing(slot)),
        }
    }

    pub fn int32(&self, slot: usize) -> Result<i32> {
        match self.get(slot) {
            Some(FieldValue::Int32(v)) => Ok(*v),
            Some(other) => Err(Self::wrong_type(slot, "int32", other)),
            None => Err(Self::missing(slot)),
        }
    }

    /// Like [`Struct::int32`], but a slot the layout did not declare yields `default`.
    pub fn int32_or(&self, slot: usize, default: i32) -> Result<i32> {
        match self.get(slot) {
            None => Ok(default),
            Some(_) => self.int32(slot),
        }
    }

    pub fn int64(&self, slot: usize) -> Result<i64> {
        match self.get(slot) {
            Some(FieldValue::Int64(v)) => Ok(*v),
            Some(other) => Err(Self::wrong_type(slot, "int64", other)),
            None => Err(Self::missing(slot)),
        }
    }

    pub fn take_string(&mut self, slot: usize) -> Result<Option<String>> {
        match self.take(slot) {
            Some(FieldValue::String(v)) => Ok(v),
            Some(other) => Err(Self::wrong_type(slot, "string", &other)),
            None => Err(Self::missing(slot)),
        }
    }

    pub fn take_array(&mut self, slot: usize) -> Result<Option<Vec<Struct>>> {
        match self.take(slot) {
            Some(FieldValue::Array(v)) => Ok(v),
            Some(other) => Err(Self::wrong_type(slot, "array", &other)),
            None => Err(Self::missing(slot)),
        }
    }
}

fn mismatch(name: &str, ty: FieldType, value: Option<&FieldValue>) -> WireError {
    match value {
        Some(v) => WireError::SchemaMismatch(format!(
            "field {} is {} but value is {}",
            name,
            ty,
            v.kind()
        )),
        None => WireError::SchemaMismatch(format!("no value for field {} ({})", name, ty)),
    }
}

fn array_count(name: &str, len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| WireError::InvalidArgument(format!("array {} has {} elements", name, len)))
}

/// Write `s` using `schema`. Every declared field must have a value of a
/// compatible type in its slot.
pub fn write_struct(dst: &mut BytesMut, schema: &Schema, s: &Struct) -> Result<()> {
    for field in schema.fields {
        let value = s.get(field.slot);
        match (field.ty, value) {
            (FieldType::Int16, Some(FieldValue::Int16(v))) => dst.put_i16(*v),
            (FieldType::Int32, Some(FieldValue::Int32(v))) => dst.put_i32(*v),
            (FieldType::Int64, Some(FieldValue::Int64(v))) => dst.put_i64(*v),
            (FieldType::NullableString, Some(FieldValue::String(v))) => {
                write_nullable_string(dst, v.as_deref())?
            }
            (FieldType::CompactNullableString, Some(FieldValue::String(v))) => {
                write_compact_nullable_string(dst, v.as_deref())?
            }
            (FieldType::Array(elem), Some(FieldValue::Array(v))) => match v {
                None => dst.put_i32(-1),
                Some(items) => {
                    dst.put_i32(array_count(field.name, items.len())?);
                    for item in items {
                        write_struct(dst, elem, item)?;
                    }
                }
            },
            (FieldType::CompactArray(elem), Some(FieldValue::Array(v))) => match v {
                None => write_unsigned_varint(dst, 0),
                Some(items) => {
                    let n = array_count(field.name, items.len())? as u32;
                    write_unsigned_varint(dst, n + 1);
                    for item in items {
                        write_struct(dst, elem, item)?;
                    }
                }
            },
            (ty, value) => return Err(mismatch(field.name, ty, value)),
        }
    }
    if schema.flexible {
        write_empty_tagged_fields(dst);
    }
    Ok(())
}

/// Read one struct laid out by `schema`.
pub fn read_struct<B: Buf>(src: &mut B, schema: &Schema) -> Result<Struct> {
    let slots = schema.fields.iter().map(|f| f.slot + 1).max().unwrap_or(0);
    let mut out = Struct::with_slots(slots);
    for field in schema.fields {
        let value = match field.ty {
            FieldType::Int16 => FieldValue::Int16(read_i16(src)?),
            FieldType::Int32 => FieldValue::Int32(read_i32(src)?),
            FieldType::Int64 => FieldValue::Int64(read_i64(src)?),
            FieldType::NullableString => FieldValue::String(read_nullable_string(src)?),
            FieldType::CompactNullableString => {
                FieldValue::String(read_compact_nullable_string(src)?)
            }
            FieldType::Array(elem) => {
                let len = read_array_len(src)?;
                FieldValue::Array(read_elements(src, elem, len)?)
            }
            FieldType::CompactArray(elem) => {
                let len = read_compact_array_len(src)?;
                FieldValue::Array(read_elements(src, elem, len)?)
            }
        };
        out.set(field.slot, value);
    }
    if schema.flexible {
        skip_tagged_fields(src)?;
    }
    Ok(out)
}

fn read_elements<B: Buf>(
    src: &mut B,
    elem: &Schema,
    len: Option<usize>,
) -> Result<Option<Vec<Struct>>> {
    let Some(n) = len else {
        return Ok(None);
    };
    // Cap the preallocation by what the buffer could possibly hold.
    let mut items = Vec::with_capacity(n.min(src.remaining()));
    for _ in 0..n {
        items.push(read_struct(src, elem)?);
    }
    Ok(Some(items))
}

fn ensure_consumed<B: Buf>(src: &B, what: &str) -> Result<()> {
    if src.has_remaining() {
        return Err(WireError::malformed(format!(
            "{} trailing bytes after {}",
            src.remaining(),
            what
        )));
    }
    Ok(())
}

/// Append the body of `request` to `dst` using the layout for its version.
pub fn write_request_body<R, S>(dst: &mut BytesMut, request: &R, registry: &S) -> Result<()>
where
    R: ProtocolRequest,
    S: SchemaRegistry + ?Sized,
{
    let schema = registry.request_schema(R::API_KEY, request.version())?;
    write_struct(dst, schema, &request.to_struct())
}

/// Encode a request body (no header, no frame).
pub fn encode_request<R, S>(request: &R, registry: &S) -> Result<Bytes>
where
    R: ProtocolRequest,
    S: SchemaRegistry + ?Sized,
{
    let mut dst = BytesMut::new();
    write_request_body(&mut dst, request, registry)?;
    Ok(dst.freeze())
}

/// Decode a request body for `version`. The whole buffer must be consumed.
pub fn decode_request<R, S, B>(mut src: B, version: i16, registry: &S) -> Result<R>
where
    R: ProtocolRequest,
    S: SchemaRegistry + ?Sized,
    B: Buf,
{
    let schema = registry.request_schema(R::API_KEY, version)?;
    let s = read_struct(&mut src, schema)?;
    ensure_consumed(&src, R::API_KEY.name())?;
    R::from_struct(s, version)
}

pub fn write_response_body<R, S>(
    dst: &mut BytesMut,
    response: &R,
    version: i16,
    registry: &S,
) -> Result<()>
where
    R: ProtocolResponse,
    S: SchemaRegistry + ?Sized,
{
    let schema = registry.response_schema(R::API_KEY, version)?;
    write_struct(dst, schema, &response.to_struct())
}

/// Encode a response body for `version` (no header, no frame).
pub fn encode_response<R, S>(response: &R, version: i16, registry: &S) -> Result<Bytes>
where
    R: ProtocolResponse,
    S: SchemaRegistry + ?Sized,
{
    let mut dst = BytesMut::new();
    write_response_body(&mut dst, response, version, registry)?;
    Ok(dst.freeze())
}

/// Decode a response body for `version`. The whole buffer must be consumed.
pub fn decode_response<R, S, B>(mut src: B, version: i16, registry: &S) -> Result<R>
where
    R: ProtocolResponse,
    S: SchemaRegistry + ?Sized,
    B: Buf,
{
    let schema = registry.response_schema(R::API_KEY, version)?;
    let s = read_struct(&mut src, schema)?;
    ensure_consumed(&src, R::API_KEY.name())?;
    R::from_struct(s)
}

/// Header + body + length prefix, ready for the socket.
pub fn encode_request_frame<R, S>(
    header: &RequestHeader,
    request: &R,
    registry: &S,
) -> Result<BytesMut>
where
    R: ProtocolRequest,
    S: SchemaRegistry + ?Sized,
{
    if header.api_key != R::API_KEY || header.api_version != request.version() {
        return Err(WireError::InvalidArgument(format!(
            "header {} v{} does not match request {} v{}",
            header.api_key,
            header.api_version,
            R::API_KEY,
            request.version()
        )));
    }
    let mut body = BytesMut::new();
    header.write(&mut body)?;
    write_request_body(&mut body, request, registry)?;
    frame(&body)
}

/// Response header + body + length prefix for a request of `api_version`.
pub fn encode_response_frame<R, S>(
    correlation_id: i32,
    response: &R,
    api_version: i16,
    registry: &S,
) -> Result<BytesMut>
where
    R: ProtocolResponse,
    S: SchemaRegistry + ?Sized,
{
    let mut body = BytesMut::new();
    ResponseHeader { correlation_id }.write(&mut body, R::API_KEY, api_version);
    write_response_body(&mut body, response, api_version, registry)?;
    frame(&body)
}
