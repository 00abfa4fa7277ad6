use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use zerocopy::byteorder::big_endian::{I32 as I32BE, I64 as I64BE};

use super::builtin::{read_be, utf8};
use super::{BinaryDecoder, DataType, Decoded, DecoderHandle, TextDecoder, TypeRegistry};
use crate::constant::Oid;
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn register(registry: &mut TypeRegistry) {
    registry.register(DataType::new("date", Oid::DATE, || {
        DecoderHandle::full(Date::default())
    }));
    registry.register(DataType::new("timestamp", Oid::TIMESTAMP, || {
        DecoderHandle::full(Timestamp::default())
    }));
    registry.register(DataType::new("timestamptz", Oid::TIMESTAMPTZ, || {
        DecoderHandle::full(TimestampTz::default())
    }));
}

// Binary date and time values count from 2000-01-01
fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn from_micros(micros: i64, name: &str) -> Result<NaiveDateTime> {
    epoch()
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| Error::Decode(format!("{} out of range: {}", name, micros)))
}

#[derive(Debug, Default)]
pub struct Date(Option<NaiveDate>);

impl Decoded for Date {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::Date)
    }
}

impl TextDecoder for Date {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let text = utf8::<Self>(src)?;
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| Error::Decode(format!("invalid date {:?}: {}", text, e)))?;
        self.0 = Some(date);
        Ok(())
    }
}

impl BinaryDecoder for Date {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let days = read_be::<I32BE>(src, "date")?.get();
        let date = epoch()
            .date()
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| Error::Decode(format!("date out of range: {}", days)))?;
        self.0 = Some(date);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Timestamp(Option<NaiveDateTime>);

impl Decoded for Timestamp {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::Timestamp)
    }
}

impl TextDecoder for Timestamp {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let text = utf8::<Self>(src)?;
        let ts = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| Error::Decode(format!("invalid timestamp {:?}: {}", text, e)))?;
        self.0 = Some(ts);
        Ok(())
    }
}

impl BinaryDecoder for Timestamp {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let micros = read_be::<I64BE>(src, "timestamp")?.get();
        self.0 = Some(from_micros(micros, "timestamp")?);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TimestampTz(Option<DateTime<Utc>>);

impl Decoded for TimestampTz {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::TimestampTz)
    }
}

impl TextDecoder for TimestampTz {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let text = utf8::<Self>(src)?;
        let ts = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
            .map_err(|e| Error::Decode(format!("invalid timestamptz {:?}: {}", text, e)))?;
        self.0 = Some(ts.with_timezone(&Utc));
        Ok(())
    }
}

impl BinaryDecoder for TimestampTz {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let micros = read_be::<I64BE>(src, "timestamptz")?.get();
        self.0 = Some(from_micros(micros, "timestamptz")?.and_utc());
        Ok(())
    }
}
