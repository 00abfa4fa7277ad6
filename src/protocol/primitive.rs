use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE};

use crate::error::{Error, Result};

fn eof(what: &str) -> Error {
    Error::ProtocolError(format!("unexpected end of message reading {}", what))
}

/// Read 1-byte integer
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&byte, rest)) => Ok((byte, rest)),
        None => Err(eof("u8")),
    }
}

/// Read 2-byte big-endian integer
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    let Ok((value, rest)) = I16BE::read_from_prefix(data) else {
        return Err(eof("int16"));
    };
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian integer
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    let Ok((value, rest)) = I32BE::read_from_prefix(data) else {
        return Err(eof("int32"));
    };
    Ok((value.get(), rest))
}

/// Read a null-terminated string, without the terminator
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let Some(end) = data.iter().position(|&b| b == 0) else {
        return Err(eof("string"));
    };
    let (value, rest) = data.split_at(end);
    Ok((value, &rest[1..]))
}

/// Read a null-terminated string as UTF-8
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (value, rest) = read_cstring(data)?;
    let value = simdutf8::basic::from_utf8(value)
        .map_err(|e| Error::ProtocolError(format!("invalid UTF-8 in message: {}", e)))?;
    Ok((value, rest))
}

/// Read exactly `len` bytes
pub fn read_bytes(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(eof("bytes"));
    }
    Ok(data.split_at(len))
}

pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_cstring(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(value);
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance() {
        let data = [0x00, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, b'h', b'i', 0, 7];
        let (n, rest) = read_i16(&data).unwrap();
        assert_eq!(n, 2);
        let (m, rest) = read_i32(rest).unwrap();
        assert_eq!(m, -1);
        let (s, rest) = read_cstr(rest).unwrap();
        assert_eq!(s, "hi");
        let (b, rest) = read_u8(rest).unwrap();
        assert_eq!(b, 7);
        assert!(rest.is_empty());
    }

    #[test]
    fn short_reads_fail() {
        assert!(read_u8(&[]).is_err());
        assert!(read_i16(&[1]).is_err());
        assert!(read_i32(&[1, 2, 3]).is_err());
        assert!(read_cstring(b"no terminator").is_err());
        assert!(read_bytes(&[1, 2], 3).is_err());
    }

    #[test]
    fn writes_big_endian() {
        let mut out = Vec::new();
        write_i16(&mut out, 1);
        write_i32(&mut out, -2);
        write_cstring(&mut out, b"ab");
        assert_eq!(out, [0, 1, 0xFF, 0xFF, 0xFF, 0xFE, b'a', b'b', 0]);
    }
}
