//! Protocol module - Defines the LLAP wire protocol
//!
//! Every LLAP frame is exactly 12 ASCII bytes:
//! - 1 byte frame marker (`'a'`)
//! - 2 bytes address (destination for requests, source for responses)
//! - 9 bytes payload (key followed by value, padded with `'-'`)

mod address;
mod codec;
mod message;
mod reader;

pub use address::*;
pub use codec::*;
pub use message::*;
pub use reader::*;

/// Total length of a frame on the wire
pub const FRAME_LEN: usize = 12;

/// Length of the key/value payload carried by a frame
pub const PAYLOAD_LEN: usize = 9;

/// Byte that starts every frame
pub const FRAME_MARKER: u8 = b'a';

/// Byte used to pad short payloads
pub const FILLER: u8 = b'-';
