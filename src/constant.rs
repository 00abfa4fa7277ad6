use std::fmt;

/// PostgreSQL type object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(pub u32);

impl Oid {
    pub const BOOL: Oid = Oid(16);
    pub const BYTEA: Oid = Oid(17);
    pub const CHAR: Oid = Oid(18);
    pub const NAME: Oid = Oid(19);
    pub const INT8: Oid = Oid(20);
    pub const INT2: Oid = Oid(21);
    pub const INT4: Oid = Oid(23);
    pub const TEXT: Oid = Oid(25);
    pub const OID: Oid = Oid(26);
    pub const JSON: Oid = Oid(114);
    pub const FLOAT4: Oid = Oid(700);
    pub const FLOAT8: Oid = Oid(701);
    pub const UNKNOWN: Oid = Oid(705);
    pub const BPCHAR: Oid = Oid(1042);
    pub const VARCHAR: Oid = Oid(1043);
    pub const DATE: Oid = Oid(1082);
    pub const TIMESTAMP: Oid = Oid(1114);
    pub const TIMESTAMPTZ: Oid = Oid(1184);
    pub const NUMERIC: Oid = Oid(1700);
    pub const UUID: Oid = Oid(2950);
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Wire encoding of a column value
///
/// Servers only send `TEXT` and `BINARY`, but the code is kept raw so that an
/// unexpected value can be reported instead of silently mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatCode(pub i16);

impl FormatCode {
    pub const TEXT: FormatCode = FormatCode(0);
    pub const BINARY: FormatCode = FormatCode(1);

    pub fn is_known(self) -> bool {
        self == Self::TEXT || self == Self::BINARY
    }
}

impl Default for FormatCode {
    fn default() -> Self {
        Self::TEXT
    }
}

/// Backend message type bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTag {
    ParseComplete = b'1',
    BindComplete = b'2',
    CloseComplete = b'3',
    NotificationResponse = b'A',
    CommandComplete = b'C',
    DataRow = b'D',
    ErrorResponse = b'E',
    EmptyQueryResponse = b'I',
    NoticeResponse = b'N',
    ParameterStatus = b'S',
    RowDescription = b'T',
    ReadyForQuery = b'Z',
    NoData = b'n',
    ParameterDescription = b't',
}

impl BackendTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'1' => Some(Self::ParseComplete),
            b'2' => Some(Self::BindComplete),
            b'3' => Some(Self::CloseComplete),
            b'A' => Some(Self::NotificationResponse),
            b'C' => Some(Self::CommandComplete),
            b'D' => Some(Self::DataRow),
            b'E' => Some(Self::ErrorResponse),
            b'I' => Some(Self::EmptyQueryResponse),
            b'N' => Some(Self::NoticeResponse),
            b'S' => Some(Self::ParameterStatus),
            b'T' => Some(Self::RowDescription),
            b'Z' => Some(Self::ReadyForQuery),
            b'n' => Some(Self::NoData),
            b't' => Some(Self::ParameterDescription),
            _ => None,
        }
    }
}

/// Frontend message type bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendTag {
    Bind = b'B',
    Describe = b'D',
    Execute = b'E',
    Parse = b'P',
    Query = b'Q',
    Sync = b'S',
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tag_round_trips_known_bytes() {
        for tag in [
            BackendTag::RowDescription,
            BackendTag::DataRow,
            BackendTag::CommandComplete,
            BackendTag::ReadyForQuery,
            BackendTag::NoData,
        ] {
            assert_eq!(BackendTag::from_u8(tag as u8), Some(tag));
        }
        assert_eq!(BackendTag::from_u8(b'?'), None);
    }

    #[test]
    fn format_code_known() {
        assert!(FormatCode::TEXT.is_known());
        assert!(FormatCode::BINARY.is_known());
        assert!(!FormatCode(7).is_known());
        assert_eq!(FormatCode::default(), FormatCode::TEXT);
    }
}
