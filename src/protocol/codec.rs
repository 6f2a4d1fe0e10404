//! Frame codec
//!
//! Packs addresses and key/value payloads into fixed 12-byte frames and
//! splits frames back into their fields.

use std::fmt;

use thiserror::Error;

use super::{Address, Payload, FRAME_LEN, FRAME_MARKER, PAYLOAD_LEN};

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid frame length: {0} bytes (expected 12)")]
    InvalidLength(usize),

    #[error("Missing frame marker, found byte {0:#04x}")]
    MissingMarker(u8),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A complete 12-byte LLAP frame
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Encode a frame for `address` carrying `key` followed by `value`.
    ///
    /// Anything beyond the 9 payload bytes is dropped.
    pub fn encode(address: Address, key: &str, value: &str) -> Self {
        Self::from_parts(address.to_bytes(), Payload::pack(key, value))
    }

    fn from_parts(address: [u8; 2], payload: Payload) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = FRAME_MARKER;
        bytes[1..3].copy_from_slice(&address);
        bytes[3..].copy_from_slice(payload.as_bytes());
        Self(bytes)
    }

    /// Validate a raw frame captured from the wire
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let bytes: [u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidLength(bytes.len()))?;
        if bytes[0] != FRAME_MARKER {
            return Err(CodecError::MissingMarker(bytes[0]));
        }
        Ok(Self(bytes))
    }

    /// Split the frame into its address and payload.
    ///
    /// The address is `None` when the field holds neither a node address
    /// nor one of the sentinels.
    pub fn decode(&self) -> (Option<Address>, Payload) {
        (Address::from_bytes(self.address_bytes()), self.payload())
    }

    pub fn address_bytes(&self) -> [u8; 2] {
        [self.0[1], self.0[2]]
    }

    pub fn payload(&self) -> Payload {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes.copy_from_slice(&self.0[3..]);
        Payload::new(bytes)
    }

    /// Same frame with its address field replaced
    pub fn with_address(&self, address: Address) -> Self {
        Self::from_parts(address.to_bytes(), self.payload())
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:?})", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let frame = Frame::encode(Address::Node(*b"BA"), "ACK", "");
        assert_eq!(frame.as_bytes(), b"aBAACK------");

        let frame = Frame::encode(Address::Broadcast, "HELLO", "");
        assert_eq!(frame.as_bytes(), b"a..HELLO----");
    }

    #[test]
    fn test_encode_truncates_overflow() {
        let frame = Frame::encode(Address::Unassigned, "CHDEVID", "BCDE");
        assert_eq!(frame.as_bytes(), b"a--CHDEVIDBC");
    }

    #[test]
    fn test_decode_fields() {
        let frame = Frame::from_bytes(b"aBCTMPA21.5-").unwrap();
        let (address, payload) = frame.decode();
        assert_eq!(address, Some(Address::Node(*b"BC")));
        assert_eq!(payload.key(), "TMPA");
        assert_eq!(payload.value().as_deref(), Some("21.5"));
    }

    #[test]
    fn test_decode_malformed_address() {
        let frame = Frame::from_bytes(b"ab1HELLO----").unwrap();
        assert_eq!(frame.decode().0, None);
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        assert_eq!(
            Frame::from_bytes(b"aBCHELLO"),
            Err(CodecError::InvalidLength(8))
        );
        assert_eq!(
            Frame::from_bytes(b"xBCHELLO----"),
            Err(CodecError::MissingMarker(b'x'))
        );
    }

    #[test]
    fn test_with_address() {
        let frame = Frame::from_bytes(b"a..HELLO----").unwrap();
        let reply = frame.with_address(Address::Node(*b"GH"));
        assert_eq!(reply.as_bytes(), b"aGHHELLO----");
    }

    fn payload_text() -> impl Strategy<Value = String> {
        "[A-Z0-9.]{0,12}"
    }

    proptest! {
        #[test]
        fn prop_payload_is_key_then_value_padded(
            key in payload_text(),
            value in payload_text(),
        ) {
            let frame = Frame::encode(Address::Broadcast, &key, &value);
            let (_, payload) = frame.decode();

            let mut expected: Vec<u8> = key.bytes().chain(value.bytes()).take(PAYLOAD_LEN).collect();
            expected.resize(PAYLOAD_LEN, b'-');
            prop_assert_eq!(&payload.as_bytes()[..], &expected[..]);
            prop_assert_eq!(frame.as_bytes().len(), FRAME_LEN);
        }

        #[test]
        fn prop_fixed_over_capacity_is_not_rendered(
            precision in 0u8..=7,
            scale in 1.0f32..50.0,
            negative in any::<bool>(),
        ) {
            let limit = 10f32.powi(8 - i32::from(precision));
            let value = if negative { -limit * scale } else { limit * scale };
            prop_assert!(Value::fixed(value, precision).render().is_none());
        }
    }
}
