//! Several statements sent in one round trip.
//!
//! The first statement to fail kills the batch: its cursor reports the error
//! to the batch on close, and every later statement comes back as an already
//! failed cursor.

use std::cell::RefCell;

use crate::error::{Error, Result};
use crate::rows::{ConnContext, ReaderSource, Row, Rows};
use crate::transport::{CommandTag, MultiResultReader, Statement};
use crate::value::Value;

/// Told when a statement of a batch fails
pub trait AbortBatch {
    /// Record `err` as the reason the batch died. Only the first call counts.
    fn abort(&self, err: &Error);
}

/// The first error of a batch
#[derive(Debug, Default)]
pub struct BatchState {
    err: RefCell<Option<Error>>,
}

impl BatchState {
    pub fn err(&self) -> Option<Error> {
        self.err.borrow().clone()
    }
}

impl AbortBatch for BatchState {
    fn abort(&self, err: &Error) {
        let mut slot = self.err.borrow_mut();
        if slot.is_none() {
            *slot = Some(err.clone());
        }
    }
}

/// Statements queued to be sent together
///
/// ```rs
/// let mut batch = Batch::new();
/// batch.queue("INSERT INTO t VALUES ($1)", vec![Value::Int4(1)]);
/// batch.queue("SELECT count(*) FROM t", vec![]);
/// let mut results = conn.send_batch(batch);
/// results.exec()?;
/// let (n,): (i64,) = results.query_row().read()?;
/// results.close()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Batch {
    statements: Vec<Statement>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, sql: impl Into<String>, args: Vec<Value>) {
        self.statements.push((sql.into(), args));
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub(crate) fn into_statements(self) -> Vec<Statement> {
        self.statements
    }
}

/// Results of a sent batch, read in queue order
pub struct BatchResults<'c> {
    ctx: &'c ConnContext,
    reader: Option<Box<dyn MultiResultReader + 'c>>,
    statements: std::vec::IntoIter<Statement>,
    state: BatchState,
    closed: bool,
}

impl<'c> BatchResults<'c> {
    pub(crate) fn new(
        ctx: &'c ConnContext,
        reader: Box<dyn MultiResultReader + 'c>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            ctx,
            reader: Some(reader),
            statements: statements.into_iter(),
            state: BatchState::default(),
            closed: false,
        }
    }

    /// Results of a batch that could not be sent
    pub(crate) fn failed(ctx: &'c ConnContext, statements: Vec<Statement>, err: Error) -> Self {
        let state = BatchState::default();
        state.abort(&err);
        Self {
            ctx,
            reader: None,
            statements: statements.into_iter(),
            state,
            closed: false,
        }
    }

    /// The error that killed the batch, if any
    pub fn err(&self) -> Option<Error> {
        self.state.err()
    }

    /// A cursor over the next statement's rows
    pub fn query(&mut self) -> Rows<'_> {
        let (sql, args) = self.statements.next().unwrap_or_default();
        let ctx = self.ctx;
        let batch: &dyn AbortBatch = &self.state;

        if let Some(err) = self.state.err() {
            return Rows::failed(ctx, Some(batch), sql, args, err);
        }
        let Some(reader) = self.reader.as_deref_mut() else {
            return Rows::failed(ctx, Some(batch), sql, args, no_result());
        };
        if !reader.next_result() {
            let err = match reader.close() {
                Ok(()) => no_result(),
                Err(e) => e,
            };
            return Rows::failed(ctx, Some(batch), sql, args, err);
        }
        Rows::new(ctx, Some(batch), ReaderSource::Batch(reader), sql, args)
    }

    /// Read the next statement's result to the end and return its tag
    pub fn exec(&mut self) -> Result<CommandTag> {
        let mut rows = self.query();
        while rows.next_row() {}
        if let Some(err) = rows.err() {
            return Err(err.clone());
        }
        Ok(rows.command_tag().cloned().unwrap_or_default())
    }

    /// The first row of the next statement
    pub fn query_row(&mut self) -> Row<'_> {
        Row::new(self.query())
    }

    /// Read whatever is left of the batch and report the error that killed it
    pub fn close(mut self) -> Result<()> {
        self.close_reader();
        match self.state.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close_reader(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(reader) = self.reader.as_deref_mut()
            && let Err(e) = reader.close()
        {
            self.state.abort(&e);
        }
        self.reader = None;
    }
}

impl Drop for BatchResults<'_> {
    fn drop(&mut self) {
        self.close_reader();
    }
}

fn no_result() -> Error {
    Error::ProtocolError("no result".to_string())
}
