//! Interfaces between the cursor and the wire layer.

use auto_impl::auto_impl;

use crate::col::FieldDescription;
use crate::constant::FormatCode;
use crate::error::Result;
use crate::value::Value;

/// The row stream of a single statement
#[auto_impl(&mut, Box)]
pub trait ResultReader {
    /// Advance to the next row. `false` once the stream is exhausted or failed.
    fn next_row(&mut self) -> bool;

    /// Column metadata. Valid once the first row has been read.
    fn field_descriptions(&self) -> &[FieldDescription];

    /// Hand the current row buffers to the caller. `None` is SQL NULL.
    fn values(&mut self) -> Vec<Option<Vec<u8>>>;

    /// Release the stream and report how the statement completed
    fn close(&mut self) -> Result<CommandTag>;
}

/// A sequence of statement results
#[auto_impl(&mut, Box)]
pub trait MultiResultReader {
    fn next_result(&mut self) -> bool;

    /// The reader of the current result, after `next_result` returned `true`
    fn result_reader(&mut self) -> Option<&mut dyn ResultReader>;

    fn close(&mut self) -> Result<()>;
}

/// One statement with its arguments, as queued in a batch
pub type Statement = (String, Vec<Value>);

/// Dispatches queries on an established session
#[auto_impl(&mut, Box)]
pub trait Transport {
    /// Simple protocol. `sql` may hold several statements; results are text.
    fn exec(&mut self, sql: &str) -> Result<Box<dyn MultiResultReader + '_>>;

    /// Extended protocol with text-encoded parameters
    fn exec_params(
        &mut self,
        sql: &str,
        args: &[Value],
        result_format: FormatCode,
    ) -> Result<Box<dyn ResultReader + '_>>;

    /// Every statement in one round trip, one result per statement
    fn exec_batch(
        &mut self,
        statements: &[Statement],
        result_format: FormatCode,
    ) -> Result<Box<dyn MultiResultReader + '_>>;
}

/// The completion tag of a statement, e.g. `INSERT 0 3` or `SELECT 10`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTag(pub String);

impl CommandTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing row count, or 0 for commands that report none
    pub fn rows_affected(&self) -> u64 {
        self.0
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    fn command(&self) -> &str {
        self.0.split(' ').next().unwrap_or_default()
    }

    pub fn is_select(&self) -> bool {
        self.command() == "SELECT"
    }

    pub fn is_insert(&self) -> bool {
        self.command() == "INSERT"
    }

    pub fn is_update(&self) -> bool {
        self.command() == "UPDATE"
    }

    pub fn is_delete(&self) -> bool {
        self.command() == "DELETE"
    }
}

impl std::fmt::Display for CommandTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tag_counts() {
        assert_eq!(CommandTag::new("INSERT 0 3").rows_affected(), 3);
        assert_eq!(CommandTag::new("SELECT 10").rows_affected(), 10);
        assert_eq!(CommandTag::new("CREATE TABLE").rows_affected(), 0);
        assert_eq!(CommandTag::default().rows_affected(), 0);
    }

    #[test]
    fn command_tag_kind() {
        assert!(CommandTag::new("SELECT 1").is_select());
        assert!(CommandTag::new("INSERT 0 1").is_insert());
        assert!(CommandTag::new("UPDATE 2").is_update());
        assert!(CommandTag::new("DELETE 0").is_delete());
        assert!(!CommandTag::new("SELECTED").is_select());
    }
}
