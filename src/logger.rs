//! Per-query observability records.

use std::time::Duration;

use auto_impl::auto_impl;
use log::Level;

use crate::value::Value;

/// What a cursor reports when it closes
#[derive(Debug, Clone, Copy)]
pub enum QueryRecord<'a> {
    /// Closed without error, at [`Level::Info`]
    Success {
        sql: &'a str,
        args: &'a [Value],
        elapsed: Duration,
        row_count: u64,
    },
    /// Closed with an error latched, at [`Level::Error`]
    Failure { sql: &'a str, args: &'a [Value] },
}

impl QueryRecord<'_> {
    pub fn level(&self) -> Level {
        match self {
            QueryRecord::Success { .. } => Level::Info,
            QueryRecord::Failure { .. } => Level::Error,
        }
    }
}

/// Receives a record from every cursor that closes
#[auto_impl(&, Box, Arc)]
pub trait QueryLogger {
    fn log(&self, level: Level, record: &QueryRecord<'_>);
}

/// Forwards records as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn log(&self, _level: Level, record: &QueryRecord<'_>) {
        match *record {
            QueryRecord::Success {
                sql,
                args,
                elapsed,
                row_count,
            } => {
                tracing::info!(sql, args = ?args, time = ?elapsed, row_count, "Query");
            }
            QueryRecord::Failure { sql, args } => {
                tracing::error!(sql, args = ?args, "Query");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn record_levels() {
        let args = [Value::Int4(1)];
        let success = QueryRecord::Success {
            sql: "SELECT $1",
            args: &args,
            elapsed: Duration::from_millis(3),
            row_count: 1,
        };
        let failure = QueryRecord::Failure {
            sql: "SELECT $1",
            args: &args,
        };
        assert_eq!(success.level(), Level::Info);
        assert_eq!(failure.level(), Level::Error);
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn tracing_logger_emits_success_fields() {
        let args = [Value::Int4(7)];
        let output = captured(|| {
            TracingLogger.log(
                Level::Info,
                &QueryRecord::Success {
                    sql: "SELECT 1",
                    args: &args,
                    elapsed: Duration::from_micros(250),
                    row_count: 1,
                },
            );
        });
        assert!(output.contains("INFO"), "{output}");
        assert!(output.contains("sql=\"SELECT 1\""), "{output}");
        assert!(output.contains("args=[Int4(7)]"), "{output}");
        assert!(output.contains("row_count=1"), "{output}");
        assert!(output.contains("time="), "{output}");
    }

    #[test]
    fn tracing_logger_emits_failure_fields() {
        let output = captured(|| {
            TracingLogger.log(
                Level::Error,
                &QueryRecord::Failure {
                    sql: "SELECT 2",
                    args: &[],
                },
            );
        });
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("sql=\"SELECT 2\""), "{output}");
        assert!(!output.contains("row_count"), "{output}");
    }
}
