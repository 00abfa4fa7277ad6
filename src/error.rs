use std::sync::Arc;

use thiserror::Error;

use crate::constant::Oid;

pub use color_eyre::eyre::eyre;

/// Fields of a backend ErrorResponse message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{severity}: {message} (SQLSTATE {code})")]
pub struct ServerError {
    pub severity: String,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
}

/// Errors are `Clone` so that a cursor can latch the first failure and still
/// hand it back to the caller that triggered it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ServerError),

    #[error("IO error: {0}")]
    IoError(Arc<std::io::Error>),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Scan received wrong number of arguments, got {got} but expected {expected}")]
    ScanArgCount { got: usize, expected: usize },

    #[error("can't scan into dest[{col}]: {source}")]
    ScanArg { col: usize, source: Box<Error> },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown type: oid {0}")]
    UnknownType(Oid),

    #[error("Unknown format code: {0}")]
    UnknownFormat(i16),

    #[error("no rows in result set")]
    NoRows,

    #[error("rows is closed")]
    RowsClosed,

    #[error("Library bug: {0}")]
    LibraryBug(Arc<color_eyre::Report>),
}

impl Error {
    pub fn library_bug(report: color_eyre::Report) -> Self {
        Error::LibraryBug(Arc::new(report))
    }

    /// The server error behind this error, looking through scan wrappers
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::ServerError(e) => Some(e),
            Error::ScanArg { source, .. } => source.server_error(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(Arc::new(err))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
