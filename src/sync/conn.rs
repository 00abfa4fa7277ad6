use std::io::{Read, Write};

use crate::batch::{Batch, BatchResults};
use crate::error::{Error, Result};
use crate::logger::QueryLogger;
use crate::opts::Opts;
use crate::rows::{ConnContext, ReaderSource, Row, Rows};
use crate::sync::wire::WireTransport;
use crate::transport::{CommandTag, Transport};
use crate::types::TypeRegistry;
use crate::value::Value;

/// A blocking connection
///
/// At most one query is outstanding: every cursor mutably borrows the
/// connection until it is dropped.
pub struct Conn<T: Transport> {
    transport: T,
    ctx: ConnContext,
}

impl<S: Read + Write> Conn<WireTransport<S>> {
    /// Create a connection over a session stream that has already completed
    /// startup and authentication
    ///
    /// ```rs
    /// let conn = Conn::new_with_stream(stream, "postgres://localhost/app?log_level=debug")?;
    /// ```
    pub fn new_with_stream<O>(stream: S, opts: O) -> Result<Self>
    where
        O: TryInto<Opts>,
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        Ok(Self::new_with_transport(WireTransport::new(stream), opts))
    }
}

impl<T: Transport> Conn<T> {
    pub fn new_with_transport(transport: T, opts: Opts) -> Self {
        Self {
            transport,
            ctx: ConnContext::new(opts),
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.ctx.opts
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.ctx.registry
    }

    /// Register extra types here
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.ctx.registry
    }

    /// Replace the logger that receives a record from every closed cursor
    pub fn set_logger(&mut self, logger: impl QueryLogger + 'static) {
        self.ctx.logger = Box::new(logger);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send the query and return a cursor over its rows. The cursor is
    /// closed with the error latched if the query could not be sent.
    fn dispatch(&mut self, sql: &str, args: &[Value]) -> Rows<'_> {
        let ctx = &self.ctx;
        let source = if args.is_empty() {
            self.transport.exec(sql).map(|mut multi| {
                // an empty result list surfaces from close
                multi.next_result();
                ReaderSource::Multi(multi)
            })
        } else {
            self.transport
                .exec_params(sql, args, ctx.opts.result_format)
                .map(ReaderSource::Result)
        };
        match source {
            Ok(source) => Rows::new(ctx, None, source, sql.to_owned(), args.to_vec()),
            Err(e) => Rows::failed(ctx, None, sql.to_owned(), args.to_vec(), e),
        }
    }

    /// Execute a query and return a cursor over its rows
    ///
    /// Without arguments the simple protocol is used and `sql` may hold several
    /// statements; only the rows of the first are returned. With arguments the
    /// statement is sent through the extended protocol with text parameters.
    #[tracing::instrument(skip_all, fields(application_name = self.ctx.opts.application_name.as_deref()))]
    pub fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows<'_>> {
        let rows = self.dispatch(sql, args);
        if let Some(err) = rows.err().cloned() {
            return Err(err);
        }
        Ok(rows)
    }

    /// Execute a query that is expected to return one row
    #[tracing::instrument(skip_all, fields(application_name = self.ctx.opts.application_name.as_deref()))]
    pub fn query_row(&mut self, sql: &str, args: &[Value]) -> Row<'_> {
        Row::new(self.dispatch(sql, args))
    }

    /// Execute a query and discard its rows
    #[tracing::instrument(skip_all, fields(application_name = self.ctx.opts.application_name.as_deref()))]
    pub fn query_drop(&mut self, sql: &str, args: &[Value]) -> Result<CommandTag> {
        let mut rows = self.dispatch(sql, args);
        while rows.next_row() {}
        match rows.err() {
            Some(err) => Err(err.clone()),
            None => Ok(rows.command_tag().cloned().unwrap_or_default()),
        }
    }

    /// Send every queued statement in one round trip
    #[tracing::instrument(skip_all, fields(application_name = self.ctx.opts.application_name.as_deref()))]
    pub fn send_batch(&mut self, batch: Batch) -> BatchResults<'_> {
        let statements = batch.into_statements();
        let ctx = &self.ctx;
        match self
            .transport
            .exec_batch(&statements, ctx.opts.result_format)
        {
            Ok(reader) => BatchResults::new(ctx, reader, statements),
            Err(e) => BatchResults::failed(ctx, statements, e),
        }
    }
}
