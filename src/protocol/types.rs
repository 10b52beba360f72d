//! Primitive wire types: fixed-width integers, (compact) nullable strings,
//! unsigned varints and tagged-field sections.
//!
//! All integers are big-endian signed. Reads check `remaining()` first and
//! report short buffers as malformed instead of panicking.

use crate::error::{Result, WireError};
use bytes::{Buf, BufMut};

fn ensure<B: Buf>(src: &B, n: usize, what: &str) -> Result<()> {
    if src.remaining() < n {
        return Err(WireError::malformed(format!(
            "short {}: need {} bytes, have {}",
            what,
            n,
            src.remaining()
        )));
    }
    Ok(())
}

pub fn read_i16<B: Buf>(src: &mut B) -> Result<i16> {
    ensure(src, 2, "int16")?;
    Ok(src.get_i16())
}

pub fn read_i32<B: Buf>(src: &mut B) -> Result<i32> {
    ensure(src, 4, "int32")?;
    Ok(src.get_i32())
}

pub fn read_i64<B: Buf>(src: &mut B) -> Result<i64> {
    ensure(src, 8, "int64")?;
    Ok(src.get_i64())
}

fn read_utf8<B: Buf>(src: &mut B, n: usize) -> Result<String> {
    ensure(src, n, "string")?;
    let mut b = vec![0u8; n];
    src.copy_to_slice(&mut b);
    String::from_utf8(b).map_err(|e| WireError::malformed(format!("invalid utf-8: {}", e)))
}

/// Read nullable string: int16 length (-1 = null), then bytes.
pub fn read_nullable_string<B: Buf>(src: &mut B) -> Result<Option<String>> {
    let len = read_i16(src)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(WireError::malformed(format!("negative string length {}", len)));
    }
    read_utf8(src, len as usize).map(Some)
}

/// Write nullable string: `None` is a -1 length with no following bytes.
pub fn write_nullable_string<B: BufMut>(dst: &mut B, s: Option<&str>) -> Result<()> {
    match s {
        None => dst.put_i16(-1),
        Some(s) => {
            let b = s.as_bytes();
            let len = i16::try_from(b.len()).map_err(|_| {
                WireError::InvalidArgument(format!("string of {} bytes exceeds int16 length", b.len()))
            })?;
            dst.put_i16(len);
            dst.put_slice(b);
        }
    }
    Ok(())
}

pub fn read_unsigned_varint<B: Buf>(src: &mut B) -> Result<u32> {
    let mut v: u32 = 0;
    let mut shift = 0u32;
    loop {
        ensure(src, 1, "varint")?;
        let b = src.get_u8();
        v |= ((b & 0x7f) as u32) << shift;
        if b & 0x80 == 0 {
            return Ok(v);
        }
        shift += 7;
        if shift >= 35 {
            return Err(WireError::malformed("varint too long"));
        }
    }
}

pub fn write_unsigned_varint<B: BufMut>(dst: &mut B, mut u: u32) {
    while u > 0x7f {
        dst.put_u8((u as u8) | 0x80);
        u >>= 7;
    }
    dst.put_u8(u as u8);
}

/// Read compact nullable string: unsigned varint length+1 (0 = null), then bytes.
pub fn read_compact_nullable_string<B: Buf>(src: &mut B) -> Result<Option<String>> {
    let len = read_unsigned_varint(src)?;
    if len == 0 {
        return Ok(None);
    }
    read_utf8(src, (len - 1) as usize).map(Some)
}

pub fn write_compact_nullable_string<B: BufMut>(dst: &mut B, s: Option<&str>) -> Result<()> {
    match s {
        None => write_unsigned_varint(dst, 0),
        Some(s) => {
            let b = s.as_bytes();
            let len = u32::try_from(b.len() + 1).map_err(|_| {
                WireError::InvalidArgument(format!("string of {} bytes is too long", b.len()))
            })?;
            write_unsigned_varint(dst, len);
            dst.put_slice(b);
        }
    }
    Ok(())
}

/// Array length for the classic encoding: int32 count, -1 = null.
pub fn read_array_len<B: Buf>(src: &mut B) -> Result<Option<usize>> {
    let n = read_i32(src)?;
    if n == -1 {
        return Ok(None);
    }
    if n < 0 {
        return Err(WireError::malformed(format!("negative array length {}", n)));
    }
    Ok(Some(n as usize))
}

/// Array length for the compact encoding: unsigned varint count+1, 0 = null.
pub fn read_compact_array_len<B: Buf>(src: &mut B) -> Result<Option<usize>> {
    let n = read_unsigned_varint(src)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some((n - 1) as usize))
}

/// Skip a tagged-field section. Unknown tags are ignored, as the protocol allows.
pub fn skip_tagged_fields<B: Buf>(src: &mut B) -> Result<usize> {
    let count = read_unsigned_varint(src)?;
    for _ in 0..count {
        let tag = read_unsigned_varint(src)?;
        let size = read_unsigned_varint(src)? as usize;
        ensure(src, size, "tagged field")?;
        tracing::debug!(tag, size, "skipping unknown tagged field");
        src.advance(size);
    }
    Ok(count as usize)
}

/// Write an empty tagged-field section.
pub fn write_empty_tagged_fields<B: BufMut>(dst: &mut B) {
    write_unsigned_varint(dst, 0);
}
