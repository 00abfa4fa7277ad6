mod conn;
mod wire;

pub use conn::Conn;
pub use wire::{WireTransport, read_message};
