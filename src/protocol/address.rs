//! Network addresses
//!
//! Nodes are identified by two uppercase letters. Two sentinels share the
//! same 2-byte field: `--` for a node that has no address yet and `..` for
//! messages aimed at every node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address '{0}': expected two letters A-Z, '--' or '..'")]
    Invalid(String),
}

/// A 2-character LLAP address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Address {
    /// A node address, two bytes in `A`-`Z`
    Node([u8; 2]),
    /// No address assigned yet (`--`)
    #[default]
    Unassigned,
    /// Every node (`..`)
    Broadcast,
}

impl Address {
    /// Address always taken by the coordinator
    pub const COORDINATOR: Address = Address::Node(*b"AA");

    const UNASSIGNED: [u8; 2] = *b"--";
    const BROADCAST: [u8; 2] = *b"..";

    /// Build a node address, rejecting anything outside `A`-`Z`
    pub fn node(bytes: [u8; 2]) -> Option<Self> {
        if bytes.iter().all(u8::is_ascii_uppercase) {
            Some(Address::Node(bytes))
        } else {
            None
        }
    }

    /// Interpret a raw address field, accepting both sentinels
    pub fn from_bytes(bytes: [u8; 2]) -> Option<Self> {
        match bytes {
            Self::UNASSIGNED => Some(Address::Unassigned),
            Self::BROADCAST => Some(Address::Broadcast),
            other => Self::node(other),
        }
    }

    /// The two bytes written into the frame's address field
    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            Address::Node(bytes) => bytes,
            Address::Unassigned => Self::UNASSIGNED,
            Address::Broadcast => Self::BROADCAST,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, Address::Unassigned)
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Address::Broadcast)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.to_bytes();
        write!(f, "{}{}", a as char, b as char)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 2] = s
            .as_bytes()
            .try_into()
            .map_err(|_| AddressError::Invalid(s.to_string()))?;
        Address::from_bytes(bytes).ok_or_else(|| AddressError::Invalid(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
