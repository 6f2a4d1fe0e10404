//! Transport module - Byte-oriented links carrying LLAP frames
//!
//! Provides:
//! - The `Transport` trait the protocol engine polls
//! - An in-memory transport for tests and loopback setups
//! - A stream transport fed by a byte channel and writing to any `Write`

mod memory;
mod stream;

pub use memory::*;
pub use stream::*;

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// A serial-style byte link.
///
/// Reads never block: `bytes_available` reports what is already buffered
/// and `read_byte` returns `None` when nothing is. The link offers no
/// framing of its own.
pub trait Transport {
    /// Number of bytes buffered and ready to read
    fn bytes_available(&mut self) -> usize;

    /// Next byte without consuming it
    fn peek_byte(&mut self) -> Option<u8>;

    /// Consume the next byte
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue bytes for transmission
    fn write_bytes(&mut self, buf: &[u8]) -> TransportResult<()>;

    /// Push queued bytes onto the link
    fn flush(&mut self) -> TransportResult<()>;
}
