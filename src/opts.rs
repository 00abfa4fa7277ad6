use log::LevelFilter;
use smart_default::SmartDefault;

use crate::constant::FormatCode;
use crate::error::Error;

/// A configuration for a connection
///
/// ```rs
/// let mut opts1 = Opts::default();
/// opts1.log_level = LevelFilter::Error;
///
/// let opts2 = Opts::try_from("postgres://localhost/app?log_level=debug&result_format=binary")?;
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    /// Query records below this level are not handed to the logger
    #[default(LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Result format requested for parameterized queries and batches.
    /// Simple-protocol queries always come back in text.
    #[default(FormatCode::TEXT)]
    pub result_format: FormatCode,

    /// Included in every query span
    pub application_name: Option<String>,
}

fn parse_log_level(value: &str) -> Result<LevelFilter, Error> {
    match value.to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "none" | "off" => Ok(LevelFilter::Off),
        _ => Err(Error::BadConfigError(format!(
            "Invalid log_level '{}'",
            value
        ))),
    }
}

fn parse_result_format(value: &str) -> Result<FormatCode, Error> {
    match value.to_ascii_lowercase().as_str() {
        "text" => Ok(FormatCode::TEXT),
        "binary" => Ok(FormatCode::BINARY),
        _ => Err(Error::BadConfigError(format!(
            "Invalid result_format '{}', expected 'text' or 'binary'",
            value
        ))),
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::BadConfigError(format!("Failed to parse URL: {}", e)))?;

        if parsed.scheme() != "postgres" && parsed.scheme() != "postgresql" {
            return Err(Error::BadConfigError(format!(
                "Invalid URL scheme '{}', expected 'postgres'",
                parsed.scheme()
            )));
        }

        let mut opts = Self::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "log_level" => opts.log_level = parse_log_level(&value)?,
                "result_format" => opts.result_format = parse_result_format(&value)?,
                "application_name" => opts.application_name = Some(value.into_owned()),
                // connection parameters belong to whoever opened the session
                _ => {}
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&String> for Opts {
    type Error = Error;

    fn try_from(url: &String) -> Result<Self, Self::Error> {
        Self::try_from(url.as_str())
    }
}
