//! Column codec registry.
//!
//! A [`TypeRegistry`] maps a type OID to a [`DataType`], whose factory builds a
//! fresh [`DecoderHandle`] for every value. The handle is tagged with the wire
//! formats the type can decode itself; a format the type does not cover falls
//! through to [`GenericText`] or [`GenericBinary`].

mod builtin;
#[cfg(feature = "with-chrono")]
mod datetime;
#[cfg(feature = "with-uuid")]
mod identifier;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::constant::{FormatCode, Oid};
use crate::error::{Error, Result};
use crate::raw::ScanTarget;
use crate::value::Value;

pub use builtin::{
    Bool, Bytea, Char, Float4, Float8, GenericBinary, GenericText, Int2, Int4, Int8, Json,
    Numeric, OidValue, Text,
};
#[cfg(feature = "with-chrono")]
pub use datetime::{Date, Timestamp, TimestampTz};
#[cfg(feature = "with-uuid")]
pub use identifier::Uuid;

/// Exposes the logical value after a successful decode
pub trait Decoded {
    fn get(&self) -> Value;
}

pub trait TextDecoder: Decoded {
    fn decode_text(&mut self, registry: &TypeRegistry, src: &[u8]) -> Result<()>;
}

pub trait BinaryDecoder: Decoded {
    fn decode_binary(&mut self, registry: &TypeRegistry, src: &[u8]) -> Result<()>;
}

/// A decoder for both wire formats
pub trait FullDecoder: TextDecoder + BinaryDecoder {}

impl<T: TextDecoder + BinaryDecoder> FullDecoder for T {}

bitflags! {
    /// Wire formats a decoder handles natively
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const TEXT = 1;
        const BINARY = 1 << 1;
    }
}

/// A freshly built decoder, tagged with its capabilities
pub enum DecoderHandle {
    Text(Box<dyn TextDecoder>),
    Binary(Box<dyn BinaryDecoder>),
    Full(Box<dyn FullDecoder>),
}

impl DecoderHandle {
    pub fn text<D: TextDecoder + 'static>(decoder: D) -> Self {
        Self::Text(Box::new(decoder))
    }

    pub fn binary<D: BinaryDecoder + 'static>(decoder: D) -> Self {
        Self::Binary(Box::new(decoder))
    }

    pub fn full<D: FullDecoder + 'static>(decoder: D) -> Self {
        Self::Full(Box::new(decoder))
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Text(_) => Capabilities::TEXT,
            Self::Binary(_) => Capabilities::BINARY,
            Self::Full(_) => Capabilities::TEXT | Capabilities::BINARY,
        }
    }

    /// Decode `src` in the given format and return the logical value.
    ///
    /// A format outside the handle's capabilities is decoded by the generic
    /// decoder of that format.
    pub fn decode(self, format: FormatCode, registry: &TypeRegistry, src: &[u8]) -> Result<Value> {
        match format {
            FormatCode::TEXT => match self {
                Self::Text(mut decoder) => {
                    decoder.decode_text(registry, src)?;
                    Ok(decoder.get())
                }
                Self::Full(mut decoder) => {
                    decoder.decode_text(registry, src)?;
                    Ok(decoder.get())
                }
                Self::Binary(_) => generic_text(registry, src),
            },
            FormatCode::BINARY => match self {
                Self::Binary(mut decoder) => {
                    decoder.decode_binary(registry, src)?;
                    Ok(decoder.get())
                }
                Self::Full(mut decoder) => {
                    decoder.decode_binary(registry, src)?;
                    Ok(decoder.get())
                }
                Self::Text(_) => generic_binary(registry, src),
            },
            FormatCode(other) => Err(Error::UnknownFormat(other)),
        }
    }
}

impl fmt::Debug for DecoderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecoderHandle")
            .field(&self.capabilities())
            .finish()
    }
}

pub type DecoderFactory = Arc<dyn Fn() -> DecoderHandle + Send + Sync>;

/// A registered type: its name, OID and decoder factory
#[derive(Clone)]
pub struct DataType {
    pub name: String,
    pub oid: Oid,
    factory: DecoderFactory,
}

impl DataType {
    pub fn new<F>(name: impl Into<String>, oid: Oid, factory: F) -> Self
    where
        F: Fn() -> DecoderHandle + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            oid,
            factory: Arc::new(factory),
        }
    }

    /// Build a decoder with no state carried over from earlier values
    pub fn new_decoder(&self) -> DecoderHandle {
        (self.factory)()
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataType")
            .field("name", &self.name)
            .field("oid", &self.oid)
            .finish_non_exhaustive()
    }
}

/// Maps OIDs to decoders
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_oid: HashMap<Oid, DataType>,
    by_name: HashMap<String, Oid>,
}

impl TypeRegistry {
    /// A registry with no types at all
    pub fn empty() -> Self {
        Self {
            by_oid: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a type, replacing any type with the same OID or name
    pub fn register(&mut self, data_type: DataType) {
        if let Some(previous) = self.by_oid.get(&data_type.oid) {
            self.by_name.remove(&previous.name);
        }
        self.by_name.insert(data_type.name.clone(), data_type.oid);
        self.by_oid.insert(data_type.oid, data_type);
    }

    pub fn data_type_for_oid(&self, oid: Oid) -> Option<&DataType> {
        self.by_oid.get(&oid)
    }

    pub fn data_type_for_name(&self, name: &str) -> Option<&DataType> {
        self.by_name
            .get(name)
            .and_then(|oid| self.by_oid.get(oid))
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    /// Decode one column value. NULL decodes to `Value::Null`; an unregistered
    /// OID is an error.
    pub fn decode(&self, oid: Oid, format: FormatCode, src: Option<&[u8]>) -> Result<Value> {
        let Some(src) = src else {
            return Ok(Value::Null);
        };
        let data_type = self.data_type_for_oid(oid).ok_or(Error::UnknownType(oid))?;
        data_type.new_decoder().decode(format, self, src)
    }

    /// Decode one column value straight into `dest`.
    ///
    /// Unregistered OIDs decode through the generic decoder of the format, so
    /// that text and byte destinations still work for types the registry does
    /// not know.
    pub fn scan(
        &self,
        oid: Oid,
        format: FormatCode,
        src: Option<&[u8]>,
        dest: &mut dyn ScanTarget,
    ) -> Result<()> {
        let value = match src {
            None => Value::Null,
            Some(src) => match self.data_type_for_oid(oid) {
                Some(data_type) => data_type.new_decoder().decode(format, self, src)?,
                None => match format {
                    FormatCode::TEXT => generic_text(self, src)?,
                    FormatCode::BINARY => generic_binary(self, src)?,
                    FormatCode(other) => return Err(Error::UnknownFormat(other)),
                },
            },
        };
        dest.scan_value(value)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        builtin::register(&mut registry);
        #[cfg(feature = "with-uuid")]
        identifier::register(&mut registry);
        #[cfg(feature = "with-chrono")]
        datetime::register(&mut registry);
        registry
    }
}

fn generic_text(registry: &TypeRegistry, src: &[u8]) -> Result<Value> {
    let mut decoder = GenericText::default();
    decoder.decode_text(registry, src)?;
    Ok(decoder.get())
}

fn generic_binary(registry: &TypeRegistry, src: &[u8]) -> Result<Value> {
    let mut decoder = GenericBinary::default();
    decoder.decode_binary(registry, src)?;
    Ok(decoder.get())
}
