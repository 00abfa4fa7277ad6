pub mod batch;
pub mod col;
pub mod constant;
pub mod error;
pub mod logger;
mod opts;
pub mod protocol;
pub mod raw;
pub mod rows;
pub mod sync;
pub mod transport;
pub mod types;
pub mod value;

pub use batch::{Batch, BatchResults};
pub use error::{Error, Result};
pub use opts::Opts;
pub use raw::{FromRow, FromValue, ScanTarget};
pub use rows::{Row, Rows};
pub use value::Value;
