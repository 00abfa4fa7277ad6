use crate::constant::{FormatCode, Oid};

/// Column metadata from a RowDescription message
///
/// Identical for every row of one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
    /// OID of the source table, or 0 if the column is not a plain table column
    pub table_oid: u32,
    /// Attribute number of the source column, or 0
    pub table_attribute_number: u16,
    pub data_type_oid: Oid,
    /// Negative values denote variable-width types
    pub data_type_size: i16,
    pub type_modifier: i32,
    pub format: FormatCode,
}

impl FieldDescription {
    /// A description with only the parts the cursor needs; the rest zeroed
    pub fn new(name: impl Into<String>, data_type_oid: Oid, format: FormatCode) -> Self {
        Self {
            name: name.into(),
            table_oid: 0,
            table_attribute_number: 0,
            data_type_oid,
            data_type_size: -1,
            type_modifier: -1,
            format,
        }
    }
}
