//! The result cursor.
//!
//! A [`Rows`] is bound to the single outstanding query of a connection. It is
//! closed by reading it to the end, by [`Rows::close`], by the first fatal
//! error, or when dropped. Until then the connection stays mutably borrowed.

use std::time::Instant;

use log::Level;

use crate::batch::AbortBatch;
use crate::col::FieldDescription;
use crate::error::{Error, Result, eyre};
use crate::logger::{QueryLogger, QueryRecord, TracingLogger};
use crate::opts::Opts;
use crate::raw::{FromRow, ScanTarget};
use crate::transport::{CommandTag, MultiResultReader, ResultReader};
use crate::types::TypeRegistry;
use crate::value::Value;

/// The parts of a connection a cursor reads while it is open
pub struct ConnContext {
    pub opts: Opts,
    pub registry: TypeRegistry,
    pub logger: Box<dyn QueryLogger>,
}

impl ConnContext {
    pub fn new(opts: Opts) -> Self {
        Self {
            opts,
            registry: TypeRegistry::default(),
            logger: Box::new(TracingLogger),
        }
    }

    pub fn should_log(&self, level: Level) -> bool {
        level <= self.opts.log_level
    }

    fn log(&self, record: &QueryRecord<'_>) {
        let level = record.level();
        if self.should_log(level) {
            self.logger.log(level, record);
        }
    }
}

impl std::fmt::Debug for ConnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnContext")
            .field("opts", &self.opts)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Where the cursor's rows come from
pub(crate) enum ReaderSource<'c> {
    /// An extended-protocol statement
    Result(Box<dyn ResultReader + 'c>),
    /// A simple-protocol request; closed together with the cursor
    Multi(Box<dyn MultiResultReader + 'c>),
    /// One statement of a batch; the batch closes the reader
    Batch(&'c mut dyn MultiResultReader),
    /// Nothing was dispatched
    None,
}

impl ReaderSource<'_> {
    fn result_reader(&mut self) -> Option<&mut dyn ResultReader> {
        match self {
            ReaderSource::Result(reader) => Some(reader.as_mut()),
            ReaderSource::Multi(multi) => multi.result_reader(),
            ReaderSource::Batch(multi) => multi.result_reader(),
            ReaderSource::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowsState {
    Open,
    Closed,
}

pub struct Rows<'c> {
    ctx: &'c ConnContext,
    batch: Option<&'c dyn AbortBatch>,
    source: ReaderSource<'c>,
    /// Buffers of the current row; `None` is SQL NULL
    values: Vec<Option<Vec<u8>>>,
    /// Set from the reader on the first row
    fields: Option<Vec<FieldDescription>>,
    row_count: u64,
    column_idx: usize,
    err: Option<Error>,
    state: RowsState,
    start_time: Instant,
    sql: String,
    args: Vec<Value>,
    command_tag: Option<CommandTag>,
}

impl<'c> Rows<'c> {
    pub(crate) fn new(
        ctx: &'c ConnContext,
        batch: Option<&'c dyn AbortBatch>,
        source: ReaderSource<'c>,
        sql: String,
        args: Vec<Value>,
    ) -> Self {
        Self {
            ctx,
            batch,
            source,
            values: Vec::new(),
            fields: None,
            row_count: 0,
            column_idx: 0,
            err: None,
            state: RowsState::Open,
            start_time: Instant::now(),
            sql,
            args,
            command_tag: None,
        }
    }

    /// A cursor for a query that could not be dispatched. It is closed on
    /// return, with `err` latched and reported like any other failure.
    pub(crate) fn failed(
        ctx: &'c ConnContext,
        batch: Option<&'c dyn AbortBatch>,
        sql: String,
        args: Vec<Value>,
        err: Error,
    ) -> Self {
        let mut rows = Self::new(ctx, batch, ReaderSource::None, sql, args);
        rows.fatal(err);
        rows
    }

    /// Advance to the next row.
    ///
    /// Returns `false` when the rows are exhausted or an error occurred; the
    /// cursor is closed by then and [`Rows::err`] tells which.
    pub fn next_row(&mut self) -> bool {
        if self.state == RowsState::Closed {
            return false;
        }

        let Some(reader) = self.source.result_reader() else {
            self.close();
            return false;
        };
        if !reader.next_row() {
            self.close();
            return false;
        }

        if self.fields.is_none() {
            self.fields = Some(reader.field_descriptions().to_vec());
        }
        let values = reader.values();
        self.row_count += 1;
        self.column_idx = 0;

        let expected = self.field_descriptions().len();
        if values.len() != expected {
            self.fatal(Error::library_bug(eyre!(
                "row has {} values but {} fields",
                values.len(),
                expected
            )));
            return false;
        }
        self.values = values;
        true
    }

    /// Index of the next column of the current row
    fn next_column(&mut self) -> Option<usize> {
        if self.state == RowsState::Closed {
            return None;
        }
        if self.field_descriptions().len() <= self.column_idx {
            self.fatal(Error::ProtocolError(
                "no next column available".to_string(),
            ));
            return None;
        }
        let idx = self.column_idx;
        self.column_idx += 1;
        Some(idx)
    }

    fn stopped(&self) -> Error {
        self.err.clone().unwrap_or(Error::RowsClosed)
    }

    /// Decode the current row into `dest`, one destination per column.
    ///
    /// A `None` destination skips its column. Any failure is fatal: the
    /// cursor latches the error and closes. Destinations before the failing
    /// column keep the values already written.
    pub fn scan(&mut self, dest: &mut [Option<&mut dyn ScanTarget>]) -> Result<()> {
        if self.state == RowsState::Closed {
            return Err(Error::RowsClosed);
        }
        let expected = self.field_descriptions().len();
        if dest.len() != expected {
            let err = Error::ScanArgCount {
                got: dest.len(),
                expected,
            };
            self.fatal(err.clone());
            return Err(err);
        }

        let ctx = self.ctx;
        for (col, target) in dest.iter_mut().enumerate() {
            let Some(idx) = self.next_column() else {
                return Err(self.stopped());
            };
            let Some(target) = target else {
                continue;
            };

            let field = &self.field_descriptions()[idx];
            let result = ctx.registry.scan(
                field.data_type_oid,
                field.format,
                self.values[idx].as_deref(),
                &mut **target,
            );
            if let Err(e) = result {
                let err = Error::ScanArg {
                    col,
                    source: Box::new(e),
                };
                self.fatal(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Decode every column of the current row into a [`Value`]
    pub fn values(&mut self) -> Result<Vec<Value>> {
        if self.state == RowsState::Closed {
            return Err(Error::RowsClosed);
        }

        let num_fields = self.field_descriptions().len();
        let mut values = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            let Some(idx) = self.next_column() else {
                return Err(self.stopped());
            };
            match self.decode_column(idx) {
                Ok(value) => values.push(value),
                Err(e) => {
                    self.fatal(e.clone());
                    return Err(e);
                }
            }
        }
        Ok(values)
    }

    fn decode_column(&self, idx: usize) -> Result<Value> {
        let Some(src) = self.values[idx].as_deref() else {
            return Ok(Value::Null);
        };
        let field = &self.field_descriptions()[idx];
        let registry = &self.ctx.registry;
        let data_type = registry
            .data_type_for_oid(field.data_type_oid)
            .ok_or(Error::UnknownType(field.data_type_oid))?;
        data_type.new_decoder().decode(field.format, registry, src)
    }

    /// Decode the current row into a tuple (or `Vec<Value>`)
    pub fn read<T: FromRow>(&mut self) -> Result<T> {
        T::from_row(self)
    }

    /// Column metadata, empty until the first row has been read
    pub fn field_descriptions(&self) -> &[FieldDescription] {
        self.fields.as_deref().unwrap_or_default()
    }

    /// The first fatal error, if any
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// The completion tag, once the cursor has closed cleanly
    pub fn command_tag(&self) -> Option<&CommandTag> {
        self.command_tag.as_ref()
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_closed(&self) -> bool {
        self.state == RowsState::Closed
    }

    /// Release the rows and the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == RowsState::Closed {
            return;
        }
        self.state = RowsState::Closed;

        if let Some(reader) = self.source.result_reader() {
            match reader.close() {
                Ok(tag) => self.command_tag = Some(tag),
                Err(e) => {
                    if self.err.is_none() {
                        self.err = Some(e);
                    }
                }
            }
        }

        if let ReaderSource::Multi(multi) = &mut self.source
            && let Err(e) = multi.close()
            && self.err.is_none()
        {
            self.err = Some(e);
        }
        self.source = ReaderSource::None;
        self.values.clear();

        let record = match self.err {
            None => QueryRecord::Success {
                sql: &self.sql,
                args: &self.args,
                elapsed: self.start_time.elapsed(),
                row_count: self.row_count,
            },
            Some(_) => QueryRecord::Failure {
                sql: &self.sql,
                args: &self.args,
            },
        };
        self.ctx.log(&record);

        if let (Some(batch), Some(err)) = (self.batch, &self.err) {
            batch.abort(err);
        }
    }

    /// Latch `err` and close, unless an error is already latched
    fn fatal(&mut self, err: Error) {
        if self.err.is_some() {
            return;
        }
        self.err = Some(err);
        self.close();
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Rows<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("row_count", &self.row_count)
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

/// A query expected to produce one row
///
/// Extra rows are discarded: the cursor is closed right after the first one.
#[derive(Debug)]
pub struct Row<'c>(Rows<'c>);

impl<'c> Row<'c> {
    pub(crate) fn new(rows: Rows<'c>) -> Self {
        Self(rows)
    }

    /// Read the first row into `dest`. [`Error::NoRows`] if there was none.
    pub fn scan(self, dest: &mut [Option<&mut dyn ScanTarget>]) -> Result<()> {
        let mut rows = self.0;
        if let Some(err) = rows.err() {
            return Err(err.clone());
        }
        if !rows.next_row() {
            return Err(rows.err.clone().unwrap_or(Error::NoRows));
        }

        // a scan failure is latched and returned below
        let _ = rows.scan(dest);
        rows.close();
        match rows.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Read the first row as a tuple. [`Error::NoRows`] if there was none.
    pub fn read<T: FromRow>(self) -> Result<T> {
        let mut rows = self.0;
        if let Some(err) = rows.err() {
            return Err(err.clone());
        }
        if !rows.next_row() {
            return Err(rows.err.clone().unwrap_or(Error::NoRows));
        }

        let value = rows.read::<T>();
        rows.close();
        match rows.err() {
            Some(err) => Err(err.clone()),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::constant::{FormatCode, Oid};

    struct Scripted {
        fields: Vec<FieldDescription>,
        rows: Vec<Vec<Option<Vec<u8>>>>,
        current: Vec<Option<Vec<u8>>>,
    }

    impl Scripted {
        fn new(rows: Vec<Vec<Option<Vec<u8>>>>) -> Self {
            Self {
                fields: vec![FieldDescription::new("n", Oid::INT4, FormatCode::TEXT)],
                rows,
                current: Vec::new(),
            }
        }
    }

    impl ResultReader for Scripted {
        fn next_row(&mut self) -> bool {
            if self.rows.is_empty() {
                return false;
            }
            self.current = self.rows.remove(0);
            true
        }

        fn field_descriptions(&self) -> &[FieldDescription] {
            &self.fields
        }

        fn values(&mut self) -> Vec<Option<Vec<u8>>> {
            std::mem::take(&mut self.current)
        }

        fn close(&mut self) -> Result<CommandTag> {
            Ok(CommandTag::new("SELECT"))
        }
    }

    #[derive(Default)]
    struct CountingBatch {
        calls: Cell<usize>,
    }

    impl AbortBatch for CountingBatch {
        fn abort(&self, _err: &Error) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    fn source<'c>(rows: Vec<Vec<Option<Vec<u8>>>>) -> ReaderSource<'c> {
        ReaderSource::Result(Box::new(Scripted::new(rows)))
    }

    #[test]
    fn failing_cursor_aborts_batch_once() {
        let ctx = ConnContext::new(Opts::default());
        let batch = CountingBatch::default();
        let abort: &dyn AbortBatch = &batch;

        let mut rows = Rows::new(&ctx, Some(abort), source(vec![vec![None]]), "q".into(), vec![]);
        assert!(rows.next_row());
        let (mut a, mut b) = (0_i32, 0_i32);
        let result = rows.scan(&mut [
            Some(&mut a as &mut dyn ScanTarget),
            Some(&mut b as &mut dyn ScanTarget),
        ]);
        assert!(matches!(result, Err(Error::ScanArgCount { got: 2, expected: 1 })));
        rows.close();
        drop(rows);
        assert_eq!(batch.calls.get(), 1);
    }

    #[test]
    fn clean_cursor_does_not_abort() {
        let ctx = ConnContext::new(Opts::default());
        let batch = CountingBatch::default();
        let abort: &dyn AbortBatch = &batch;

        let mut rows = Rows::new(
            &ctx,
            Some(abort),
            source(vec![vec![Some(b"1".to_vec())]]),
            "q".into(),
            vec![],
        );
        while rows.next_row() {}
        assert!(rows.err().is_none());
        assert_eq!(rows.command_tag(), Some(&CommandTag::new("SELECT")));
        drop(rows);
        assert_eq!(batch.calls.get(), 0);
    }

    #[test]
    fn failed_cursor_starts_closed() {
        let ctx = ConnContext::new(Opts::default());
        let batch = CountingBatch::default();
        let abort: &dyn AbortBatch = &batch;

        let mut rows = Rows::failed(&ctx, Some(abort), "q".into(), vec![], Error::NoRows);
        assert!(rows.is_closed());
        assert!(!rows.next_row());
        assert!(matches!(rows.err(), Some(Error::NoRows)));
        assert!(matches!(rows.values(), Err(Error::RowsClosed)));
        drop(rows);
        assert_eq!(batch.calls.get(), 1);
    }

    #[test]
    fn scan_after_close_is_rows_closed() {
        let ctx = ConnContext::new(Opts::default());
        let mut rows = Rows::new(
            &ctx,
            None,
            source(vec![vec![Some(b"1".to_vec())]]),
            "q".into(),
            vec![],
        );
        assert!(rows.next_row());
        rows.close();

        let mut n = 0_i32;
        let err = rows.scan(&mut [Some(&mut n as &mut dyn ScanTarget)]).unwrap_err();
        assert!(matches!(err, Error::RowsClosed));
        assert!(rows.err().is_none());
        assert_eq!(n, 0);
    }

    #[test]
    fn wrong_scan_count_after_clean_close_keeps_err_clear() {
        let ctx = ConnContext::new(Opts::default());
        let batch = CountingBatch::default();
        let abort: &dyn AbortBatch = &batch;

        let mut rows = Rows::new(
            &ctx,
            Some(abort),
            source(vec![vec![Some(b"1".to_vec())]]),
            "q".into(),
            vec![],
        );
        while rows.next_row() {}
        assert!(rows.is_closed());

        let mut a = 0_i32;
        let mut b = 0_i32;
        let err = rows
            .scan(&mut [
                Some(&mut a as &mut dyn ScanTarget),
                Some(&mut b as &mut dyn ScanTarget),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::RowsClosed));
        assert!(rows.err().is_none());
        drop(rows);
        assert_eq!(batch.calls.get(), 0);
    }

    #[test]
    fn row_count_and_column_reset() {
        let ctx = ConnContext::new(Opts::default());
        let mut rows = Rows::new(
            &ctx,
            None,
            source(vec![vec![Some(b"1".to_vec())], vec![Some(b"2".to_vec())]]),
            "q".into(),
            vec![],
        );
        let mut seen = Vec::new();
        while rows.next_row() {
            let mut n = 0_i32;
            rows.scan(&mut [Some(&mut n as &mut dyn ScanTarget)]).unwrap();
            seen.push(n);
        }
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(rows.row_count(), 2);
    }
}
