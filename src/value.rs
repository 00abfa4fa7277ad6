//! Dynamic decoded values.

use std::fmt;

/// A decoded column value, or a query argument
///
/// `Null` is distinct from every zero value: a NULL column never decodes to
/// `Int4(0)` or an empty `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// `"char"`, the single-byte internal type
    Char(i8),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Oid(u32),
    Float4(f32),
    Float8(f64),
    /// text, varchar, bpchar, name, json, numeric and every text-format fallback
    Text(String),
    /// bytea and every binary-format fallback
    Bytes(Vec<u8>),
    #[cfg(feature = "with-uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "with-chrono")]
    Date(chrono::NaiveDate),
    #[cfg(feature = "with-chrono")]
    Timestamp(chrono::NaiveDateTime),
    #[cfg(feature = "with-chrono")]
    TimestampTz(chrono::DateTime<chrono::Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text-format encoding used when sending the value as a parameter.
    /// `None` is SQL NULL.
    pub fn to_text(&self) -> Option<Vec<u8>> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(if *v { b"t".to_vec() } else { b"f".to_vec() }),
            Value::Char(v) => Some(v.to_ne_bytes().to_vec()),
            Value::Bytes(v) => {
                let mut out = Vec::with_capacity(2 + v.len() * 2);
                out.extend_from_slice(b"\\x");
                for byte in v {
                    out.extend_from_slice(format!("{:02x}", byte).as_bytes());
                }
                Some(out)
            }
            Value::Text(v) => Some(v.as_bytes().to_vec()),
            other => Some(other.to_string().into_bytes()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => v.fmt(f),
            Value::Char(v) => v.fmt(f),
            Value::Int2(v) => v.fmt(f),
            Value::Int4(v) => v.fmt(f),
            Value::Int8(v) => v.fmt(f),
            Value::Oid(v) => v.fmt(f),
            Value::Float4(v) => v.fmt(f),
            Value::Float8(v) => v.fmt(f),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            #[cfg(feature = "with-uuid")]
            Value::Uuid(v) => v.fmt(f),
            #[cfg(feature = "with-chrono")]
            Value::Date(v) => v.fmt(f),
            #[cfg(feature = "with-chrono")]
            Value::Timestamp(v) => v.fmt(f),
            #[cfg(feature = "with-chrono")]
            Value::TimestampTz(v) => v.fmt(f),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )+
    };
}

impl_from_for_value!(
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytes,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_zero() {
        assert!(Value::Null.is_null());
        assert_ne!(Value::Null, Value::Int4(0));
        assert_ne!(Value::Null, Value::Text(String::new()));
    }

    #[test]
    fn text_encoding_of_arguments() {
        assert_eq!(Value::Null.to_text(), None);
        assert_eq!(Value::Bool(true).to_text().as_deref(), Some(&b"t"[..]));
        assert_eq!(Value::Int8(-42).to_text().as_deref(), Some(&b"-42"[..]));
        assert_eq!(Value::Char(65).to_text().as_deref(), Some(&b"A"[..]));
        assert_eq!(Value::Char(-1).to_text().as_deref(), Some(&[0xff][..]));
        assert_eq!(
            Value::Bytes(vec![0xde, 0xad]).to_text().as_deref(),
            Some(&b"\\xdead"[..])
        );
        assert_eq!(
            Value::from("hello").to_text().as_deref(),
            Some(&b"hello"[..])
        );
    }

    #[test]
    fn from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(7_i32)), Value::Int4(7));
    }
}
