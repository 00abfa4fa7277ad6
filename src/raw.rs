//! Scan destinations.
//!
//! [`FromValue`] converts one decoded [`Value`] into a Rust type, [`ScanTarget`]
//! is its object-safe face used by [`Rows::scan`], and [`FromRow`] decodes a
//! whole row into a tuple.

use std::any::type_name;

use crate::error::{Error, Result, eyre};
use crate::rows::Rows;
use crate::value::Value;

/// Trait for types that can be built from a decoded column value.
///
/// Each method corresponds to one logical type. Implementations should
/// return `Err` for unsupported conversions.
pub trait FromValue: Sized {
    fn from_null() -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode NULL to {}",
            type_name::<Self>()
        )))
    }

    fn from_bool(_v: bool) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode bool to {}",
            type_name::<Self>()
        )))
    }

    fn from_char(_v: i8) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode \"char\" (i8) to {}",
            type_name::<Self>()
        )))
    }

    fn from_i16(_v: i16) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode int2 (i16) to {}",
            type_name::<Self>()
        )))
    }

    fn from_i32(_v: i32) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode int4 (i32) to {}",
            type_name::<Self>()
        )))
    }

    fn from_i64(_v: i64) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode int8 (i64) to {}",
            type_name::<Self>()
        )))
    }

    fn from_oid(_v: u32) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode oid (u32) to {}",
            type_name::<Self>()
        )))
    }

    fn from_f32(_v: f32) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode float4 (f32) to {}",
            type_name::<Self>()
        )))
    }

    fn from_f64(_v: f64) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode float8 (f64) to {}",
            type_name::<Self>()
        )))
    }

    fn from_text(_v: String) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode text to {}",
            type_name::<Self>()
        )))
    }

    fn from_bytes(_v: Vec<u8>) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode bytea to {}",
            type_name::<Self>()
        )))
    }

    #[cfg(feature = "with-uuid")]
    fn from_uuid(_v: uuid::Uuid) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode uuid to {}",
            type_name::<Self>()
        )))
    }

    #[cfg(feature = "with-chrono")]
    fn from_date(_v: chrono::NaiveDate) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode date to {}",
            type_name::<Self>()
        )))
    }

    #[cfg(feature = "with-chrono")]
    fn from_timestamp(_v: chrono::NaiveDateTime) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode timestamp to {}",
            type_name::<Self>()
        )))
    }

    #[cfg(feature = "with-chrono")]
    fn from_timestamptz(_v: chrono::DateTime<chrono::Utc>) -> Result<Self> {
        Err(Error::Decode(format!(
            "Cannot decode timestamptz to {}",
            type_name::<Self>()
        )))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Self::from_null(),
            Value::Bool(v) => Self::from_bool(v),
            Value::Char(v) => Self::from_char(v),
            Value::Int2(v) => Self::from_i16(v),
            Value::Int4(v) => Self::from_i32(v),
            Value::Int8(v) => Self::from_i64(v),
            Value::Oid(v) => Self::from_oid(v),
            Value::Float4(v) => Self::from_f32(v),
            Value::Float8(v) => Self::from_f64(v),
            Value::Text(v) => Self::from_text(v),
            Value::Bytes(v) => Self::from_bytes(v),
            #[cfg(feature = "with-uuid")]
            Value::Uuid(v) => Self::from_uuid(v),
            #[cfg(feature = "with-chrono")]
            Value::Date(v) => Self::from_date(v),
            #[cfg(feature = "with-chrono")]
            Value::Timestamp(v) => Self::from_timestamp(v),
            #[cfg(feature = "with-chrono")]
            Value::TimestampTz(v) => Self::from_timestamptz(v),
        }
    }
}

/// An object-safe scan destination
///
/// Every [`FromValue`] type is one; the destination is overwritten with the
/// converted value.
pub trait ScanTarget {
    fn scan_value(&mut self, value: Value) -> Result<()>;
}

impl<T: FromValue> ScanTarget for T {
    fn scan_value(&mut self, value: Value) -> Result<()> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// Trait for decoding the current row of a cursor into a Rust type.
pub trait FromRow: Sized {
    fn from_row(rows: &mut Rows<'_>) -> Result<Self>;
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_bool(v: bool) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for i8 {
    fn from_char(v: i8) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for i16 {
    fn from_char(v: i8) -> Result<Self> {
        Ok(v as i16)
    }

    fn from_i16(v: i16) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for i32 {
    fn from_char(v: i8) -> Result<Self> {
        Ok(v as i32)
    }

    fn from_i16(v: i16) -> Result<Self> {
        Ok(v as i32)
    }

    fn from_i32(v: i32) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for i64 {
    fn from_char(v: i8) -> Result<Self> {
        Ok(v as i64)
    }

    fn from_i16(v: i16) -> Result<Self> {
        Ok(v as i64)
    }

    fn from_i32(v: i32) -> Result<Self> {
        Ok(v as i64)
    }

    fn from_i64(v: i64) -> Result<Self> {
        Ok(v)
    }

    fn from_oid(v: u32) -> Result<Self> {
        Ok(v as i64)
    }
}

impl FromValue for u32 {
    fn from_oid(v: u32) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for f32 {
    fn from_f32(v: f32) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for f64 {
    fn from_f32(v: f32) -> Result<Self> {
        Ok(v as f64)
    }

    fn from_f64(v: f64) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for String {
    fn from_text(v: String) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for Vec<u8> {
    fn from_text(v: String) -> Result<Self> {
        Ok(v.into_bytes())
    }

    fn from_bytes(v: Vec<u8>) -> Result<Self> {
        Ok(v)
    }
}

#[cfg(feature = "with-uuid")]
impl FromValue for uuid::Uuid {
    fn from_uuid(v: uuid::Uuid) -> Result<Self> {
        Ok(v)
    }
}

#[cfg(feature = "with-chrono")]
impl FromValue for chrono::NaiveDate {
    fn from_date(v: chrono::NaiveDate) -> Result<Self> {
        Ok(v)
    }
}

#[cfg(feature = "with-chrono")]
impl FromValue for chrono::NaiveDateTime {
    fn from_timestamp(v: chrono::NaiveDateTime) -> Result<Self> {
        Ok(v)
    }
}

#[cfg(feature = "with-chrono")]
impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_timestamptz(v: chrono::DateTime<chrono::Utc>) -> Result<Self> {
        Ok(v)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

// ============================================================================
// FromRow implementations
// ============================================================================

impl FromRow for Vec<Value> {
    fn from_row(rows: &mut Rows<'_>) -> Result<Self> {
        rows.values()
    }
}

/// A tuple element that has not been scanned yet
struct Slot<T>(Option<T>);

impl<T: FromValue> ScanTarget for Slot<T> {
    fn scan_value(&mut self, value: Value) -> Result<()> {
        self.0 = Some(T::from_value(value)?);
        Ok(())
    }
}

impl<T> Slot<T> {
    fn take(self) -> Result<T> {
        self.0
            .ok_or_else(|| Error::library_bug(eyre!("scan left a tuple element unset")))
    }
}

macro_rules! impl_from_row_tuple {
    ($($T:ident),+) => {
        impl<$($T: FromValue),+> FromRow for ($($T,)+) {
            #[expect(non_snake_case)]
            fn from_row(rows: &mut Rows<'_>) -> Result<Self> {
                $(
                    let mut $T = Slot::<$T>(None);
                )+
                rows.scan(&mut [$(Some(&mut $T as &mut dyn ScanTarget)),+])?;
                Ok(($($T.take()?,)+))
            }
        }
    };
}

impl_from_row_tuple!(A);
impl_from_row_tuple!(A, B);
impl_from_row_tuple!(A, B, C);
impl_from_row_tuple!(A, B, C, D);
impl_from_row_tuple!(A, B, C, D, E);
impl_from_row_tuple!(A, B, C, D, E, F);
impl_from_row_tuple!(A, B, C, D, E, F, G);
impl_from_row_tuple!(A, B, C, D, E, F, G, H);
impl_from_row_tuple!(A, B, C, D, E, F, G, H, I);
impl_from_row_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_from_row_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_from_row_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
