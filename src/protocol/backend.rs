//! Backend (server to client) message bodies.

use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U32 as U32BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::col::FieldDescription;
use crate::constant::{FormatCode, Oid};
use crate::error::{Error, Result, ServerError};
use crate::protocol::primitive::*;
use crate::transport::CommandTag;

/// Fixed-size part of one RowDescription field (18 bytes), after the name
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct FieldDescriptionTail {
    table_oid: U32BE,
    table_attribute_number: I16BE,
    data_type_oid: U32BE,
    data_type_size: I16BE,
    type_modifier: I32BE,
    format: I16BE,
}

impl FieldDescriptionTail {
    pub fn into_field(self, name: String) -> FieldDescription {
        FieldDescription {
            name,
            table_oid: self.table_oid.get(),
            table_attribute_number: self.table_attribute_number.get() as u16,
            data_type_oid: Oid(self.data_type_oid.get()),
            data_type_size: self.data_type_size.get(),
            type_modifier: self.type_modifier.get(),
            format: FormatCode(self.format.get()),
        }
    }
}

fn count(n: i16, what: &str) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| Error::ProtocolError(format!("negative {} count: {}", what, n)))
}

pub fn parse_row_description(payload: &[u8]) -> Result<Vec<FieldDescription>> {
    let (num_fields, mut data) = read_i16(payload)?;
    let num_fields = count(num_fields, "field")?;
    let mut fields = Vec::with_capacity(num_fields);
    for _ in 0..num_fields {
        let (name, rest) = read_cstr(data)?;
        let Ok((tail, rest)) = FieldDescriptionTail::read_from_prefix(rest) else {
            return Err(Error::ProtocolError(format!(
                "truncated RowDescription field {:?}",
                name
            )));
        };
        fields.push(tail.into_field(name.to_owned()));
        data = rest;
    }
    Ok(fields)
}

/// Parse a DataRow into `out`, replacing its contents. A length of -1 is NULL.
pub fn parse_data_row(payload: &[u8], out: &mut Vec<Option<Vec<u8>>>) -> Result<()> {
    out.clear();
    let (num_columns, mut data) = read_i16(payload)?;
    let num_columns = count(num_columns, "column")?;
    out.reserve(num_columns);
    for _ in 0..num_columns {
        let (len, rest) = read_i32(data)?;
        data = rest;
        if len == -1 {
            out.push(None);
            continue;
        }
        let len = usize::try_from(len)
            .map_err(|_| Error::ProtocolError(format!("invalid column length: {}", len)))?;
        let (value, rest) = read_bytes(data, len)?;
        out.push(Some(value.to_vec()));
        data = rest;
    }
    Ok(())
}

pub fn parse_command_complete(payload: &[u8]) -> Result<CommandTag> {
    let (tag, _rest) = read_cstr(payload)?;
    Ok(CommandTag::new(tag))
}

/// Parse the fields of an ErrorResponse (or NoticeResponse)
pub fn parse_error_response(payload: &[u8]) -> Result<ServerError> {
    let mut severity = None;
    let mut localized_severity = None;
    let mut code = String::new();
    let mut message = String::new();
    let mut detail = None;
    let mut hint = None;

    let mut data = payload;
    loop {
        let (field, rest) = read_u8(data)?;
        if field == 0 {
            break;
        }
        let (value, rest) = read_cstr(rest)?;
        data = rest;
        match field {
            // V is never localized, prefer it over S
            b'V' => severity = Some(value.to_owned()),
            b'S' => localized_severity = Some(value.to_owned()),
            b'C' => code = value.to_owned(),
            b'M' => message = value.to_owned(),
            b'D' => detail = Some(value.to_owned()),
            b'H' => hint = Some(value.to_owned()),
            _ => {}
        }
    }

    Ok(ServerError {
        severity: severity.or(localized_severity).unwrap_or_default(),
        code,
        message,
        detail,
        hint,
    })
}

/// Transaction status byte of ReadyForQuery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InTransaction,
    Failed,
}

pub fn parse_ready_for_query(payload: &[u8]) -> Result<TransactionStatus> {
    let (status, _rest) = read_u8(payload)?;
    match status {
        b'I' => Ok(TransactionStatus::Idle),
        b'T' => Ok(TransactionStatus::InTransaction),
        b'E' => Ok(TransactionStatus::Failed),
        other => Err(Error::ProtocolError(format!(
            "unknown transaction status: 0x{:02X}",
            other
        ))),
    }
}
