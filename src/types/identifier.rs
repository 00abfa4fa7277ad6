use super::builtin::utf8;
use super::{BinaryDecoder, DataType, Decoded, DecoderHandle, TextDecoder, TypeRegistry};
use crate::constant::Oid;
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn register(registry: &mut TypeRegistry) {
    registry.register(DataType::new("uuid", Oid::UUID, || {
        DecoderHandle::full(Uuid::default())
    }));
}

#[derive(Debug, Default)]
pub struct Uuid(Option<uuid::Uuid>);

impl Decoded for Uuid {
    fn get(&self) -> Value {
        self.0.map_or(Value::Null, Value::Uuid)
    }
}

impl TextDecoder for Uuid {
    fn decode_text(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let text = utf8::<Self>(src)?;
        let id = uuid::Uuid::parse_str(text)
            .map_err(|e| Error::Decode(format!("invalid uuid {:?}: {}", text, e)))?;
        self.0 = Some(id);
        Ok(())
    }
}

impl BinaryDecoder for Uuid {
    fn decode_binary(&mut self, _registry: &TypeRegistry, src: &[u8]) -> Result<()> {
        let id = uuid::Uuid::from_slice(src)
            .map_err(|e| Error::Decode(format!("invalid uuid bytes: {}", e)))?;
        self.0 = Some(id);
        Ok(())
    }
}
