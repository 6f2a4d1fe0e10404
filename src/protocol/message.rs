//! Protocol message definitions
//!
//! Logical view of a frame: the 9-byte payload split into key and value,
//! the control keys that drive the protocol, and the values an application
//! can send.

use std::borrow::Cow;
use std::fmt;

use super::{Address, FILLER, PAYLOAD_LEN};

/// The 9-byte key/value body of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    pub fn new(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }

    /// Pack `key` followed by `value`, truncating at 9 bytes and padding
    /// the remainder with `-`
    pub fn pack(key: &str, value: &str) -> Self {
        let mut bytes = [FILLER; PAYLOAD_LEN];
        let body = key.as_bytes().iter().chain(value.as_bytes());
        for (slot, byte) in bytes.iter_mut().zip(body) {
            *slot = *byte;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// The whole payload as text, filler included
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Leading run of uppercase letters
    pub fn key(&self) -> &str {
        let len = self
            .0
            .iter()
            .take_while(|b| b.is_ascii_uppercase())
            .count();
        std::str::from_utf8(&self.0[..len]).unwrap_or_default()
    }

    /// Everything after the key with trailing filler removed
    pub fn value(&self) -> Option<Cow<'_, str>> {
        let rest = &self.0[self.key().len()..];
        let end = rest
            .iter()
            .rposition(|b| *b != FILLER)
            .map(|i| i + 1)
            .unwrap_or(0);
        if end == 0 {
            None
        } else {
            Some(String::from_utf8_lossy(&rest[..end]))
        }
    }

    pub fn control_key(&self) -> Option<ControlKey> {
        ControlKey::classify(self)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Payload keys that trigger protocol behavior instead of being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// Presence probe; every listener answers with its own address
    Hello,
    /// A node announcing itself after power-up
    Started,
    /// Coordinator handing out a new address (`CHDEVIDxx`)
    ChangeDeviceId,
    /// Restart so a new address takes effect
    Reboot,
    /// Acknowledgement of the last message
    Ack,
}

impl ControlKey {
    pub fn keyword(self) -> &'static str {
        match self {
            ControlKey::Hello => "HELLO",
            ControlKey::Started => "STARTED",
            ControlKey::ChangeDeviceId => "CHDEVID",
            ControlKey::Reboot => "REBOOT",
            ControlKey::Ack => "ACK",
        }
    }

    /// Match a payload against the control keys, first match wins.
    ///
    /// HELLO and STARTED must fill the payload exactly (with filler);
    /// the others only need to prefix it.
    pub fn classify(payload: &Payload) -> Option<Self> {
        let bytes = payload.as_bytes();
        if bytes == b"HELLO----" {
            Some(ControlKey::Hello)
        } else if bytes == b"STARTED--" {
            Some(ControlKey::Started)
        } else if bytes.starts_with(b"CHDEVID") {
            Some(ControlKey::ChangeDeviceId)
        } else if bytes.starts_with(b"REBOOT") {
            Some(ControlKey::Reboot)
        } else if bytes.starts_with(b"ACK") {
            Some(ControlKey::Ack)
        } else {
            None
        }
    }
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An application message delivered to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Address field of the frame that carried it
    pub remote: Address,
    pub payload: Payload,
}

impl Message {
    pub fn new(remote: Address, payload: Payload) -> Self {
        Self { remote, payload }
    }

    pub fn key(&self) -> &str {
        self.payload.key()
    }

    pub fn value(&self) -> Option<Cow<'_, str>> {
        self.payload.value()
    }
}

/// Where an outbound frame goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Stamp the frame with our own address (the usual LLAP node report)
    Local,
    /// Every node (`..`)
    Broadcast,
    /// A specific address
    Node(Address),
}

/// Value carried after the key of an outbound message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// Key only
    Empty,
    Text(&'a str),
    Integer(i32),
    /// Decimal number sent with a fixed number of decimals
    Fixed { value: f32, precision: u8 },
}

impl<'a> Value<'a> {
    pub fn fixed(value: f32, precision: u8) -> Self {
        Value::Fixed { value, precision }
    }

    /// Render the value as payload text.
    ///
    /// Returns `None` when a fixed-point value cannot be represented in the
    /// payload at the requested precision: `|value| >= 10^(8 - precision)`.
    /// Such a value is never sent rather than sent truncated.
    pub fn render(&self) -> Option<Cow<'a, str>> {
        match *self {
            Value::Empty => Some(Cow::Borrowed("")),
            Value::Text(text) => Some(Cow::Borrowed(text)),
            Value::Integer(number) => Some(Cow::Owned(number.to_string())),
            Value::Fixed { value, precision } => {
                let magnitude = f64::from(value).abs();
                if magnitude.is_nan() || magnitude >= 10f64.powi(8 - i32::from(precision)) {
                    return None;
                }
                if precision == 0 {
                    Some(Cow::Owned((value as i32).to_string()))
                } else {
                    Some(Cow::Owned(format!("{:.*}", precision as usize, value)))
                }
            }
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(text: &'a str) -> Self {
        Value::Text(text)
    }
}

impl From<i32> for Value<'_> {
    fn from(number: i32) -> Self {
        Value::Integer(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_pads_with_filler() {
        let payload = Payload::pack("ACK", "");
        assert_eq!(payload.as_bytes(), b"ACK------");
    }

    #[test]
    fn test_pack_truncates_value() {
        let payload = Payload::pack("TEMP", "123456789");
        assert_eq!(payload.as_bytes(), b"TEMP12345");
    }

    #[test]
    fn test_key_and_value() {
        let payload = Payload::pack("TMPA", "21.5");
        assert_eq!(payload.key(), "TMPA");
        assert_eq!(payload.value().as_deref(), Some("21.5"));

        let payload = Payload::pack("BATTLOW", "");
        assert_eq!(payload.key(), "BATTLOW");
        assert_eq!(payload.value(), None);
    }

    #[test]
    fn test_negative_value_keeps_sign() {
        let payload = Payload::pack("TMP", "-4.25");
        assert_eq!(payload.value().as_deref(), Some("-4.25"));
    }

    #[test]
    fn test_classify_control_keys() {
        assert_eq!(
            Payload::pack("HELLO", "").control_key(),
            Some(ControlKey::Hello)
        );
        assert_eq!(
            Payload::pack("STARTED", "").control_key(),
            Some(ControlKey::Started)
        );
        assert_eq!(
            Payload::pack("CHDEVID", "BC").control_key(),
            Some(ControlKey::ChangeDeviceId)
        );
        assert_eq!(
            Payload::pack("REBOOT", "").control_key(),
            Some(ControlKey::Reboot)
        );
        assert_eq!(Payload::pack("ACK", "").control_key(), Some(ControlKey::Ack));
        assert_eq!(Payload::pack("TEMP", "20").control_key(), None);
    }

    #[test]
    fn test_hello_and_started_need_exact_payload() {
        assert_eq!(Payload::pack("HELLO", "X").control_key(), None);
        assert_eq!(Payload::pack("STARTEDOK", "").control_key(), None);
    }

    #[test]
    fn test_render_integer() {
        assert_eq!(Value::Integer(-42).render().as_deref(), Some("-42"));
    }

    #[test]
    fn test_render_fixed() {
        assert_eq!(Value::fixed(21.456, 2).render().as_deref(), Some("21.46"));
        assert_eq!(Value::fixed(-3.7, 0).render().as_deref(), Some("-3"));
    }

    #[test]
    fn test_render_fixed_out_of_range() {
        // 10^(8-2) does not fit at two decimals
        assert_eq!(Value::fixed(1_000_000.0, 2).render(), None);
        assert_eq!(Value::fixed(-1_000_000.0, 2).render(), None);
        assert!(Value::fixed(999_999.0, 2).render().is_some());
        assert_eq!(Value::fixed(f32::NAN, 1).render(), None);
    }

    #[test]
    fn test_render_whole_number_out_of_range() {
        assert_eq!(Value::fixed(1.0e9, 0).render(), None);
        assert_eq!(Value::fixed(-100_000_000.0, 0).render(), None);
        assert_eq!(Value::fixed(f32::INFINITY, 0).render(), None);
        assert_eq!(Value::fixed(f32::NEG_INFINITY, 0).render(), None);
        assert_eq!(Value::fixed(f32::NAN, 0).render(), None);
        assert_eq!(
            Value::fixed(12_345_678.0, 0).render().as_deref(),
            Some("12345678")
        );
    }
}
