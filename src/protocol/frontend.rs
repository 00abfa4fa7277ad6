//! Frontend (client to server) messages.
//!
//! Every writer appends one complete message, tag and length included, to the
//! output buffer.

use crate::constant::{FormatCode, FrontendTag};
use zerocopy::IntoBytes;

use crate::error::{Error, Result};
use crate::protocol::MessageHeader;
use crate::protocol::primitive::*;
use crate::value::Value;

const HEADER_LEN: usize = size_of::<MessageHeader>();

/// Start a message and return its offset; the header is a placeholder until `finish`
fn begin(out: &mut Vec<u8>, tag: FrontendTag) -> usize {
    let start = out.len();
    out.resize(start + HEADER_LEN, 0);
    out[start] = tag as u8;
    start
}

/// Write the header of the message starting at `start` over its placeholder
fn finish(out: &mut [u8], start: usize) -> Result<()> {
    let header = MessageHeader::encode(out[start], out.len() - start - HEADER_LEN)?;
    out[start..start + HEADER_LEN].copy_from_slice(header.as_bytes());
    Ok(())
}

fn check_nul(sql: &str) -> Result<()> {
    if sql.as_bytes().contains(&0) {
        return Err(Error::BadUsageError(
            "query text contains a NUL byte".to_string(),
        ));
    }
    Ok(())
}

pub fn write_query(out: &mut Vec<u8>, sql: &str) -> Result<()> {
    check_nul(sql)?;
    let start = begin(out, FrontendTag::Query);
    write_cstring(out, sql.as_bytes());
    finish(out, start)
}

/// Parse an unnamed statement with no parameter type hints
pub fn write_parse(out: &mut Vec<u8>, statement: &str, sql: &str) -> Result<()> {
    check_nul(sql)?;
    let start = begin(out, FrontendTag::Parse);
    write_cstring(out, statement.as_bytes());
    write_cstring(out, sql.as_bytes());
    write_i16(out, 0);
    finish(out, start)
}

/// Bind text-format parameters and request every result column in `result_format`
pub fn write_bind(
    out: &mut Vec<u8>,
    portal: &str,
    statement: &str,
    params: &[Value],
    result_format: FormatCode,
) -> Result<()> {
    let num_params = i16::try_from(params.len())
        .map_err(|_| Error::BadUsageError(format!("too many parameters: {}", params.len())))?;

    let start = begin(out, FrontendTag::Bind);
    write_cstring(out, portal.as_bytes());
    write_cstring(out, statement.as_bytes());
    // zero parameter format codes: all text
    write_i16(out, 0);
    write_i16(out, num_params);
    for param in params {
        match param.to_text() {
            None => write_i32(out, -1),
            Some(bytes) => {
                let len = i32::try_from(bytes.len()).map_err(|_| {
                    Error::BadUsageError(format!("parameter too large: {}", bytes.len()))
                })?;
                write_i32(out, len);
                out.extend_from_slice(&bytes);
            }
        }
    }
    write_i16(out, 1);
    write_i16(out, result_format.0);
    finish(out, start)
}

pub fn write_describe_portal(out: &mut Vec<u8>, portal: &str) -> Result<()> {
    let start = begin(out, FrontendTag::Describe);
    out.push(b'P');
    write_cstring(out, portal.as_bytes());
    finish(out, start)
}

/// Execute a portal; `max_rows` 0 means no limit
pub fn write_execute(out: &mut Vec<u8>, portal: &str, max_rows: i32) -> Result<()> {
    let start = begin(out, FrontendTag::Execute);
    write_cstring(out, portal.as_bytes());
    write_i32(out, max_rows);
    finish(out, start)
}

pub fn write_sync(out: &mut Vec<u8>) -> Result<()> {
    let start = begin(out, FrontendTag::Sync);
    finish(out, start)
}

/// Parse, Bind, Describe and Execute one statement through the unnamed portal
pub fn write_extended_statement(
    out: &mut Vec<u8>,
    sql: &str,
    params: &[Value],
    result_format: FormatCode,
) -> Result<()> {
    write_parse(out, "", sql)?;
    write_bind(out, "", "", params, result_format)?;
    write_describe_portal(out, "")?;
    write_execute(out, "", 0)
}
