use std::any::type_name;
use std::fmt::Display;
use std::str::FromStr;

use simdutf8::basic::from_utf8;
use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{
    F32 as F32BE, F64 as F64BE, I16 as I16BE, I32 as I32BE, I64 as I64BE, U32 as U32BE,
};

use super::{BinaryDecoder, DataType, Decoded, DecoderHandle, TextDecoder, TypeRegistry};
use crate::constant::Oid;
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn register(registry: &mut TypeRegistry) {
    registry.register(DataType::new("bool", Oid::BOOL, || {
        DecoderHandle::full(Bool::default())
    }));
    registry.register(DataType::new("bytea", Oid::BYTEA, || {
        DecoderHandle::full(Bytea::default())
    }));
    registry.register(DataType::new("char", Oid::CHAR, || {
        DecoderHandle::full(Char::default())
    }));
    registry.register(DataType::new("name", Oid::NAME, || {
        DecoderHandle::full(Text::default())
    }));
    registry.register(DataType::new("int8", Oid::INT8, || {
        DecoderHandle::full(Int8::default())
    }));
    registry.register(DataType::new("int2", Oid::INT2, || {
        DecoderHandle::full(Int2::default())
    }));
    registry.register(DataType::new("int4", Oid::INT4, || {
        DecoderHandle::full(Int4::default())
    }));
    registry.register(DataType::new("text", Oid::TEXT, || {
        DecoderHandle::full(Text::default())
    }));
    registry.register(DataType::new("oid", Oid::OID, || {
        DecoderHandle::full(OidValue::default())
    }));
    registry.register(DataType::new("json", Oid::JSON, || {
        DecoderHandle::text(Json::default())
    }));
    registry.register(DataType::new("float4", Oid::FLOAT4, || {
        DecoderHandle::full(Float4::default())
    }));
    registry.register(DataType::new("float8", Oid::FLOAT8, || {
        DecoderHandle::full(Float8::default())
    }));
    registry.register(DataType::new("unknown", Oid::UNKNOWN, || {
        DecoderHandle::full(Text::default())
    }));
    registry.register(DataType::new("bpchar", Oid::BPCHAR, || {
        DecoderHandle::full(Text::default())
    }));
    registry.register(DataType::new("varchar", Oid::VARCHAR, || {
        DecoderHandle::full(Text::default())
    }));
    registry.register(DataType::new("numeric", Oid::NUMERIC, || {
        DecoderHandle::text(Numeric::default())
    }));
}

pub(super) fn utf8<T: ?Sized>(src: &[u8]) -> Result<&str> {
    from_utf8(src).map_err(|e| {
        Error::Decode(format!(
            "invalid UTF-8 for {}: {}",
            type_name::<T>(),
            e
        ))
    })
}

pub(super) fn parse_text<T>(src: &[u8]) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text = utf8::<T>(src)?;
    text.parse::<T>().map_err(|e| {
        Error::Decode(format!(
            "cannot decode {:?} as {}: {}",
            text,
            type_name::<T>(),
            e
        ))
    })
}

pub(super) fn read_be<T: FromBytes>(src: &[u8], name: &str) -> Result<T> {
    let Ok(value) = T::read_from_bytes(src) else {
        return Err(Error::Decode(format!(
            "invalid length for {}: {}",
            name,
            src.len()
        )));
    };
    Ok(value)
}

// ============================================================================
// Generic fallbacks
// ============================================================================

/// Decodes any text-format value as a string
#[derive(Debug, Default)]
pub struct GenericText(Option<String>);

impl Decoded for GenericText {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Text)
    }
}

impl TextDecoder for GenericText {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(utf8::<str>(src)?.to_owned());
        Ok(())
    }
}

/// Keeps any binary-format value as raw bytes
#[derive(Debug, Default)]
pub struct GenericBinary(Option<Vec<u8>>);

impl Decoded for GenericBinary {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Bytes)
    }
}

impl BinaryDecoder for GenericBinary {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(src.to_vec());
        Ok(())
    }
}

// ============================================================================
// Built-in types
// ============================================================================

#[derive(Debug, Default)]
pub struct Bool(Option<bool>);

impl Decoded for Bool {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::Bool)
    }
}

impl TextDecoder for Bool {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(match src {
            b"t" | b"true" => true,
            b"f" | b"false" => false,
            _ => {
                return Err(Error::Decode(format!(
                    "invalid text for bool: {:?}",
                    String::from_utf8_lossy(src)
                )));
            }
        });
        Ok(())
    }
}

impl BinaryDecoder for Bool {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let [byte] = src else {
            return Err(Error::Decode(format!(
                "invalid length for bool: {}",
                src.len()
            )));
        };
        self.0 = Some(*byte != 0);
        Ok(())
    }
}

/// The single-byte `"char"` type
#[derive(Debug, Default)]
pub struct Char(Option<i8>);

impl Decoded for Char {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::Char)
    }
}

impl TextDecoder for Char {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        // the empty string is the NUL character
        self.0 = Some(match src {
            [] => 0,
            [byte] => i8::from_ne_bytes([*byte]),
            _ => {
                return Err(Error::Decode(format!(
                    "invalid length for char: {}",
                    src.len()
                )));
            }
        });
        Ok(())
    }
}

impl BinaryDecoder for Char {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let [byte] = src else {
            return Err(Error::Decode(format!(
                "invalid length for char: {}",
                src.len()
            )));
        };
        self.0 = Some(i8::from_ne_bytes([*byte]));
        Ok(())
    }
}

macro_rules! impl_numeric_decoder {
    ($name:ident, $ty:ty, $wire:ty, $variant:ident, $pg:literal) => {
        #[derive(Debug, Default)]
        pub struct $name(Option<$ty>);

        impl Decoded for $name {
            fn get(&self) -> Value {
                self.0.map_or(Value::Null, Value::$variant)
            }
        }

        impl TextDecoder for $name {
            fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
                self.0 = Some(parse_text::<$ty>(src)?);
                Ok(())
            }
        }

        impl BinaryDecoder for $name {
            fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
                self.0 = Some(read_be::<$wire>(src, $pg)?.get());
                Ok(())
            }
        }
    };
}

impl_numeric_decoder!(Int2, i16, I16BE, Int2, "int2");
impl_numeric_decoder!(Int4, i32, I32BE, Int4, "int4");
impl_numeric_decoder!(Int8, i64, I64BE, Int8, "int8");
impl_numeric_decoder!(OidValue, u32, U32BE, Oid, "oid");
impl_numeric_decoder!(Float4, f32, F32BE, Float4, "float4");
impl_numeric_decoder!(Float8, f64, F64BE, Float8, "float8");

/// text, varchar, bpchar, name and unknown
#[derive(Debug, Default)]
pub struct Text(Option<String>);

impl Decoded for Text {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Text)
    }
}

impl TextDecoder for Text {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(utf8::<String>(src)?.to_owned());
        Ok(())
    }
}

impl BinaryDecoder for Text {
    fn decode_binary(&mut self, registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        // the binary representation of text is its text
        self.decode_text(registry, src)
    }
}

#[derive(Debug, Default)]
pub struct Bytea(Option<Vec<u8>>);

impl Decoded for Bytea {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Bytes)
    }
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::Decode(format!(
            "invalid hex digit in bytea: {:?}",
            char::from(c)
        ))),
    }
}

fn decode_bytea_hex(src: &[u8]) -> Result<Vec<u8>> {
    if src.len() % 2 != 0 {
        return Err(Error::Decode(
            "odd number of hex digits in bytea".to_string(),
        ));
    }
    src.chunks_exact(2)
        .map(|pair| match pair {
            [hi, lo] => Ok((hex_digit(*hi)? << 4) | hex_digit(*lo)?),
            _ => Err(Error::Decode("truncated bytea".to_string())),
        })
        .collect()
}

/// The pre-9.0 escape format: `\\` is a backslash, `\ooo` an octal byte
fn decode_bytea_escape(src: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len());
    let mut rest = src;
    while let Some((&byte, tail)) = rest.split_first() {
        if byte != b'\\' {
            out.push(byte);
            rest = tail;
            continue;
        }
        match tail {
            [b'\\', tail @ ..] => {
                out.push(b'\\');
                rest = tail;
            }
            [a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', tail @ ..] => {
                out.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                rest = tail;
            }
            _ => {
                return Err(Error::Decode(
                    "invalid escape sequence in bytea".to_string(),
                ));
            }
        }
    }
    Ok(out)
}

impl TextDecoder for Bytea {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(match src.strip_prefix(b"\\x") {
            Some(hex) => decode_bytea_hex(hex)?,
            None => decode_bytea_escape(src)?,
        });
        Ok(())
    }
}

impl BinaryDecoder for Bytea {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(src.to_vec());
        Ok(())
    }
}

/// Text format only; binary json falls back to raw bytes
#[derive(Debug, Default)]
pub struct Json(Option<String>);

impl Decoded for Json {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Text)
    }
}

impl TextDecoder for Json {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        self.0 = Some(utf8::<Self>(src)?.to_owned());
        Ok(())
    }
}

/// Kept as its exact decimal text; binary numeric falls back to raw bytes
#[derive(Debug, Default)]
pub struct Numeric(Option<String>);

impl Decoded for Numeric {
    fn get(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Text)
    }
}

impl TextDecoder for Numeric {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let text = utf8::<Self>(src)?;
        let is_number = text == "NaN"
            || text == "Infinity"
            || text == "-Infinity"
            || text.parse::<f64>().is_ok();
        if !is_number {
            return Err(Error::Decode(format!("invalid text for numeric: {:?}", text)));
        }
        self.0 = Some(text.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::FormatCode;
    use crate::types::Capabilities;

    fn decode(oid: Oid, format: FormatCode, src: &[u8]) -> Result<Value> {
        TypeRegistry::default().decode(oid, format, Some(src))
    }

    #[test]
    fn integers_in_both_formats() {
        assert_eq!(decode(Oid::INT2, FormatCode::TEXT, b"-1000").unwrap(), Value::Int2(-1000));
        assert_eq!(
            decode(Oid::INT2, FormatCode::BINARY, &(-1000_i16).to_be_bytes()).unwrap(),
            Value::Int2(-1000)
        );
        assert_eq!(decode(Oid::INT4, FormatCode::TEXT, b"42").unwrap(), Value::Int4(42));
        assert_eq!(
            decode(Oid::INT4, FormatCode::BINARY, &[0xFF, 0xFE, 0x79, 0x60]).unwrap(),
            Value::Int4(-100_000)
        );
        assert_eq!(
            decode(Oid::INT8, FormatCode::BINARY, &i64::MAX.to_be_bytes()).unwrap(),
            Value::Int8(i64::MAX)
        );
        assert_eq!(decode(Oid::OID, FormatCode::TEXT, b"1259").unwrap(), Value::Oid(1259));
    }

    #[test]
    fn integer_errors() {
        assert!(matches!(
            decode(Oid::INT4, FormatCode::TEXT, b"forty-two"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            decode(Oid::INT4, FormatCode::BINARY, &[0, 0, 1]),
            Err(Error::Decode(_))
        ));
        assert!(decode(Oid::INT2, FormatCode::TEXT, b"70000").is_err());
    }

    #[test]
    fn floats() {
        assert_eq!(
            decode(Oid::FLOAT8, FormatCode::BINARY, &1.5_f64.to_be_bytes()).unwrap(),
            Value::Float8(1.5)
        );
        assert_eq!(
            decode(Oid::FLOAT4, FormatCode::TEXT, b"-0.25").unwrap(),
            Value::Float4(-0.25)
        );
        match decode(Oid::FLOAT8, FormatCode::TEXT, b"Infinity").unwrap() {
            Value::Float8(v) => assert!(v.is_infinite()),
            other => panic!("unexpected {other:?}"),
        }
        match decode(Oid::FLOAT8, FormatCode::TEXT, b"NaN").unwrap() {
            Value::Float8(v) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bools() {
        assert_eq!(decode(Oid::BOOL, FormatCode::TEXT, b"t").unwrap(), Value::Bool(true));
        assert_eq!(decode(Oid::BOOL, FormatCode::BINARY, &[0]).unwrap(), Value::Bool(false));
        assert!(decode(Oid::BOOL, FormatCode::TEXT, b"yes").is_err());
        assert!(decode(Oid::BOOL, FormatCode::BINARY, &[1, 1]).is_err());
    }

    #[test]
    fn char_type() {
        assert_eq!(decode(Oid::CHAR, FormatCode::TEXT, b"r").unwrap(), Value::Char(b'r' as i8));
        assert_eq!(decode(Oid::CHAR, FormatCode::TEXT, b"").unwrap(), Value::Char(0));
        assert!(decode(Oid::CHAR, FormatCode::BINARY, b"ab").is_err());
    }

    #[test]
    fn text_types() {
        for oid in [Oid::TEXT, Oid::VARCHAR, Oid::BPCHAR, Oid::NAME, Oid::UNKNOWN] {
            assert_eq!(
                decode(oid, FormatCode::TEXT, "h\u{e9}llo".as_bytes()).unwrap(),
                Value::Text("h\u{e9}llo".to_string())
            );
            assert_eq!(
                decode(oid, FormatCode::BINARY, b"bin").unwrap(),
                Value::Text("bin".to_string())
            );
        }
        assert!(decode(Oid::TEXT, FormatCode::TEXT, &[0xC3, 0x28]).is_err());
    }

    #[test]
    fn bytea_formats() {
        assert_eq!(
            decode(Oid::BYTEA, FormatCode::TEXT, b"\\xDEadbeef").unwrap(),
            Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert_eq!(
            decode(Oid::BYTEA, FormatCode::TEXT, b"a\\\\b\\001").unwrap(),
            Value::Bytes(vec![b'a', b'\\', b'b', 1])
        );
        assert_eq!(
            decode(Oid::BYTEA, FormatCode::BINARY, &[0, 1, 2]).unwrap(),
            Value::Bytes(vec![0, 1, 2])
        );
        assert!(decode(Oid::BYTEA, FormatCode::TEXT, b"\\xabc").is_err());
        assert!(decode(Oid::BYTEA, FormatCode::TEXT, b"\\xzz").is_err());
        assert!(decode(Oid::BYTEA, FormatCode::TEXT, b"\\9").is_err());
    }

    #[test]
    fn text_only_types_fall_back_to_generic_binary() {
        let registry = TypeRegistry::default();
        let json = registry.data_type_for_oid(Oid::JSON).unwrap();
        assert_eq!(json.new_decoder().capabilities(), Capabilities::TEXT);
        assert_eq!(
            decode(Oid::JSON, FormatCode::TEXT, br#"{"a":1}"#).unwrap(),
            Value::Text(r#"{"a":1}"#.to_string())
        );
        assert_eq!(
            decode(Oid::JSON, FormatCode::BINARY, br#"[1]"#).unwrap(),
            Value::Bytes(br#"[1]"#.to_vec())
        );
        assert_eq!(
            decode(Oid::NUMERIC, FormatCode::BINARY, &[0, 1, 0, 0]).unwrap(),
            Value::Bytes(vec![0, 1, 0, 0])
        );
    }

    #[test]
    fn binary_only_types_fall_back_to_generic_text() {
        #[derive(Default)]
        struct Point(Option<Vec<u8>>);

        impl Decoded for Point {
            fn get(&self) -> Value {
                self.0.clone().map_or(Value::Null, Value::Bytes)
            }
        }

        impl BinaryDecoder for Point {
            fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
                self.0 = Some(src.to_vec());
                Ok(())
            }
        }

        let mut registry = TypeRegistry::default();
        registry.register(DataType::new("point", Oid(600), || {
            DecoderHandle::binary(Point::default())
        }));
        assert_eq!(
            registry.decode(Oid(600), FormatCode::TEXT, Some(b"(1,2)")).unwrap(),
            Value::Text("(1,2)".to_string())
        );
        assert_eq!(
            registry.decode(Oid(600), FormatCode::BINARY, Some(&[9, 9])).unwrap(),
            Value::Bytes(vec![9, 9])
        );
    }

    #[test]
    fn numeric_validates_text() {
        assert_eq!(
            decode(Oid::NUMERIC, FormatCode::TEXT, b"12345.678900").unwrap(),
            Value::Text("12345.678900".to_string())
        );
        assert!(decode(Oid::NUMERIC, FormatCode::TEXT, b"12,5").is_err());
    }

    #[test]
    fn null_never_reaches_a_decoder() {
        let registry = TypeRegistry::default();
        assert_eq!(
            registry.decode(Oid(424242), FormatCode(9), None).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn unknown_type_and_format() {
        let registry = TypeRegistry::default();
        assert!(matches!(
            registry.decode(Oid(424242), FormatCode::TEXT, Some(b"x")),
            Err(Error::UnknownType(Oid(424242)))
        ));
        assert!(matches!(
            registry.decode(Oid::INT4, FormatCode(2), Some(b"1")),
            Err(Error::UnknownFormat(2))
        ));
    }

    #[test]
    fn register_replaces_by_oid() {
        let mut registry = TypeRegistry::default();
        let before = registry.len();
        registry.register(DataType::new("my_text", Oid::TEXT, || {
            DecoderHandle::text(GenericText::default())
        }));
        assert_eq!(registry.len(), before);
        assert!(registry.data_type_for_name("text").is_none());
        assert_eq!(
            registry.data_type_for_name("my_text").map(|t| t.oid),
            Some(Oid::TEXT)
        );
    }
}
