use std::io::{BufRead, BufReader, Read, Write};

use zerocopy::{FromZeros, IntoBytes};

use crate::col::FieldDescription;
use crate::constant::{BackendTag, FormatCode};
use crate::error::{Error, Result};
use crate::protocol::MessageHeader;
use crate::protocol::backend::{
    TransactionStatus, parse_command_complete, parse_data_row, parse_error_response,
    parse_ready_for_query, parse_row_description,
};
use crate::protocol::frontend::{write_extended_statement, write_query, write_sync};
use crate::transport::{CommandTag, MultiResultReader, ResultReader, Statement, Transport};
use crate::value::Value;

/// A [`Transport`] over an established and authenticated session stream
pub struct WireTransport<S: Read + Write> {
    stream: BufReader<S>,
    /// Reusable buffer for reading message bodies
    read_buffer: Vec<u8>,
    /// Reusable buffer for building outgoing messages
    write_buffer: Vec<u8>,
    transaction_status: TransactionStatus,
}

impl<S: Read + Write> WireTransport<S> {
    /// Wrap a stream that is past startup and sitting at ReadyForQuery
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            read_buffer: Vec::new(),
            write_buffer: Vec::new(),
            transaction_status: TransactionStatus::Idle,
        }
    }

    /// Status reported by the last ReadyForQuery
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    #[tracing::instrument(skip_all)]
    fn flush_write_buffer(&mut self) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(&self.write_buffer)?;
        stream.flush()?;
        self.write_buffer.clear();
        Ok(())
    }
}

impl<S: Read + Write> Transport for WireTransport<S> {
    fn exec(&mut self, sql: &str) -> Result<Box<dyn MultiResultReader + '_>> {
        self.write_buffer.clear();
        write_query(&mut self.write_buffer, sql)?;
        self.flush_write_buffer()?;
        Ok(Box::new(WireResults::new(self)))
    }

    fn exec_params(
        &mut self,
        sql: &str,
        args: &[Value],
        result_format: FormatCode,
    ) -> Result<Box<dyn ResultReader + '_>> {
        self.write_buffer.clear();
        write_extended_statement(&mut self.write_buffer, sql, args, result_format)?;
        write_sync(&mut self.write_buffer)?;
        self.flush_write_buffer()?;

        let mut reader = WireResult(WireResultStream::new(self));
        reader.0.start_result();
        Ok(Box::new(reader))
    }

    fn exec_batch(
        &mut self,
        statements: &[Statement],
        result_format: FormatCode,
    ) -> Result<Box<dyn MultiResultReader + '_>> {
        self.write_buffer.clear();
        for (sql, args) in statements {
            write_extended_statement(&mut self.write_buffer, sql, args, result_format)?;
        }
        write_sync(&mut self.write_buffer)?;
        self.flush_write_buffer()?;
        Ok(Box::new(WireResults::new(self)))
    }
}

/// Read a complete backend message into `buffer` and return its tag byte
#[tracing::instrument(skip_all)]
pub fn read_message<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = MessageHeader::new_zeroed();
    reader.read_exact(header.as_mut_bytes())?;

    let length = header.body_len()?;
    buffer.resize(length, 0);
    reader.read_exact(buffer)?;

    Ok(header.tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// Between results
    Idle,
    /// Inside a result; rows may follow
    Rows,
    /// The current result has completed
    Complete,
    /// ReadyForQuery consumed, nothing more to read
    Ready,
}

/// The response stream of one round trip
///
/// Walks the results of the request in order. A server error ends the
/// stream: it is recorded, the rest of the response up to ReadyForQuery is
/// drained, and the error is reported on close.
struct WireResultStream<'a, S: Read + Write> {
    conn: &'a mut WireTransport<S>,
    state: StreamState,
    fields: Vec<FieldDescription>,
    row: Vec<Option<Vec<u8>>>,
    tag: Option<CommandTag>,
    err: Option<Error>,
}

impl<'a, S: Read + Write> WireResultStream<'a, S> {
    fn new(conn: &'a mut WireTransport<S>) -> Self {
        Self {
            conn,
            state: StreamState::Idle,
            fields: Vec::new(),
            row: Vec::new(),
            tag: None,
            err: None,
        }
    }

    fn next_message(&mut self) -> Result<BackendTag> {
        let tag = read_message(&mut self.conn.stream, &mut self.conn.read_buffer)?;
        BackendTag::from_u8(tag).ok_or_else(|| {
            Error::ProtocolError(format!("unknown backend message: 0x{:02X}", tag))
        })
    }

    fn record(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Record `err` and end the stream. Only a server error leaves the
    /// session in sync; anything else leaves it unusable.
    fn fail(&mut self, err: Error) {
        let resync = matches!(err, Error::ServerError(_));
        self.record(err);
        if resync {
            self.skip_to_ready();
        } else {
            self.state = StreamState::Ready;
        }
    }

    fn skip_to_ready(&mut self) {
        while self.state != StreamState::Ready {
            match self.next_message() {
                Ok(BackendTag::ReadyForQuery) => self.ready(),
                Ok(BackendTag::ErrorResponse) => {
                    let err = parse_error_response(&self.conn.read_buffer);
                    self.record(err.map_or_else(|e| e, Error::ServerError));
                }
                Ok(_) => {}
                Err(e) => {
                    self.record(e);
                    self.state = StreamState::Ready;
                }
            }
        }
    }

    fn ready(&mut self) {
        match parse_ready_for_query(&self.conn.read_buffer) {
            Ok(status) => self.conn.transaction_status = status,
            Err(e) => self.record(e),
        }
        self.state = StreamState::Ready;
    }

    fn server_error(&mut self) {
        let err = match parse_error_response(&self.conn.read_buffer) {
            Ok(err) => Error::ServerError(err),
            Err(e) => e,
        };
        self.fail(err);
    }

    fn complete(&mut self, tag: CommandTag) {
        self.tag = Some(tag);
        self.state = StreamState::Complete;
    }

    fn command_complete(&mut self) {
        match parse_command_complete(&self.conn.read_buffer) {
            Ok(tag) => self.complete(tag),
            Err(e) => self.fail(e),
        }
    }

    /// Move to the next result, finishing the current one first
    fn start_result(&mut self) -> bool {
        if self.state == StreamState::Rows {
            self.finish_result();
        }
        self.fields.clear();
        self.row.clear();
        self.tag = None;

        while self.state != StreamState::Ready {
            match self.next_message() {
                Ok(
                    BackendTag::ParseComplete
                    | BackendTag::BindComplete
                    | BackendTag::CloseComplete
                    | BackendTag::ParameterDescription
                    | BackendTag::NoticeResponse
                    | BackendTag::ParameterStatus
                    | BackendTag::NotificationResponse,
                ) => {}
                Ok(BackendTag::RowDescription) => {
                    match parse_row_description(&self.conn.read_buffer) {
                        Ok(fields) => {
                            self.fields = fields;
                            self.state = StreamState::Rows;
                            return true;
                        }
                        Err(e) => self.fail(e),
                    }
                }
                Ok(BackendTag::NoData) => {
                    self.state = StreamState::Rows;
                    return true;
                }
                Ok(BackendTag::CommandComplete) => {
                    self.command_complete();
                    return self.state == StreamState::Complete;
                }
                Ok(BackendTag::EmptyQueryResponse) => {
                    self.complete(CommandTag::default());
                    return true;
                }
                Ok(BackendTag::ErrorResponse) => self.server_error(),
                Ok(BackendTag::ReadyForQuery) => self.ready(),
                Ok(BackendTag::DataRow) => {
                    self.fail(Error::ProtocolError(
                        "DataRow before RowDescription".to_string(),
                    ));
                }
                Err(e) => self.fail(e),
            }
        }
        false
    }

    fn read_row(&mut self) -> bool {
        while self.state == StreamState::Rows {
            match self.next_message() {
                Ok(BackendTag::DataRow) => {
                    match parse_data_row(&self.conn.read_buffer, &mut self.row) {
                        Ok(()) => return true,
                        Err(e) => self.fail(e),
                    }
                }
                Ok(BackendTag::CommandComplete) => self.command_complete(),
                Ok(BackendTag::EmptyQueryResponse) => self.complete(CommandTag::default()),
                Ok(BackendTag::ErrorResponse) => self.server_error(),
                Ok(
                    BackendTag::NoticeResponse
                    | BackendTag::ParameterStatus
                    | BackendTag::NotificationResponse,
                ) => {}
                Ok(other) => {
                    self.fail(Error::ProtocolError(format!(
                        "unexpected message inside a result: {:?}",
                        other
                    )));
                }
                Err(e) => self.fail(e),
            }
        }
        false
    }

    fn finish_result(&mut self) {
        while self.read_row() {}
    }

    fn close_result(&mut self) -> Result<CommandTag> {
        self.finish_result();
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(self.tag.clone().unwrap_or_default()),
        }
    }

    fn close_all(&mut self) -> Result<()> {
        self.finish_result();
        self.skip_to_ready();
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl<S: Read + Write> ResultReader for WireResultStream<'_, S> {
    fn next_row(&mut self) -> bool {
        self.read_row()
    }

    fn field_descriptions(&self) -> &[FieldDescription] {
        &self.fields
    }

    fn values(&mut self) -> Vec<Option<Vec<u8>>> {
        std::mem::take(&mut self.row)
    }

    fn close(&mut self) -> Result<CommandTag> {
        self.close_result()
    }
}

/// The single result of an extended-protocol round trip
struct WireResult<'a, S: Read + Write>(WireResultStream<'a, S>);

impl<S: Read + Write> ResultReader for WireResult<'_, S> {
    fn next_row(&mut self) -> bool {
        self.0.read_row()
    }

    fn field_descriptions(&self) -> &[FieldDescription] {
        &self.0.fields
    }

    fn values(&mut self) -> Vec<Option<Vec<u8>>> {
        std::mem::take(&mut self.0.row)
    }

    fn close(&mut self) -> Result<CommandTag> {
        let tag = self.0.close_result();
        self.0.close_all()?;
        tag
    }
}

/// Every result of a simple query or a batch
struct WireResults<'a, S: Read + Write> {
    stream: WireResultStream<'a, S>,
    has_result: bool,
}

impl<'a, S: Read + Write> WireResults<'a, S> {
    fn new(conn: &'a mut WireTransport<S>) -> Self {
        Self {
            stream: WireResultStream::new(conn),
            has_result: false,
        }
    }
}

impl<S: Read + Write> MultiResultReader for WireResults<'_, S> {
    fn next_result(&mut self) -> bool {
        self.has_result = self.stream.start_result();
        self.has_result
    }

    fn result_reader(&mut self) -> Option<&mut dyn ResultReader> {
        if self.has_result {
            Some(&mut self.stream)
        } else {
            None
        }
    }

    fn close(&mut self) -> Result<()> {
        self.has_result = false;
        self.stream.close_all()
    }
}
