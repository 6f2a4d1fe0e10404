//! In-memory store
//!
//! Mirrors the 3-byte non-volatile layout used on the nodes themselves:
//! two address bytes followed by the pool counter. Erased cells read as
//! `0xFF`.

use super::{AddressStore, StoreResult};
use crate::protocol::Address;

const ERASED: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    image: [u8; 3],
}

impl MemoryStore {
    /// A store in the erased state
    pub fn new() -> Self {
        Self {
            image: [ERASED; 3],
        }
    }

    pub fn with_address(address: Address) -> Self {
        let mut store = Self::new();
        store.image[..2].copy_from_slice(&address.to_bytes());
        store
    }

    /// Raw contents: address bytes then counter
    pub fn image(&self) -> [u8; 3] {
        self.image
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressStore for MemoryStore {
    fn load_local_address(&mut self) -> StoreResult<Address> {
        match Address::node([self.image[0], self.image[1]]) {
            Some(address) => Ok(address),
            None => {
                self.save_local_address(Address::Unassigned)?;
                Ok(Address::Unassigned)
            }
        }
    }

    fn save_local_address(&mut self, address: Address) -> StoreResult<()> {
        self.image[..2].copy_from_slice(&address.to_bytes());
        Ok(())
    }

    fn load_pool_counter(&mut self) -> StoreResult<u8> {
        Ok(self.image[2])
    }

    fn save_pool_counter(&mut self, counter: u8) -> StoreResult<()> {
        self.image[2] = counter;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_store_is_unassigned() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load_local_address().unwrap(), Address::Unassigned);
        // The sentinel is written back
        assert_eq!(&store.image()[..2], b"--");
    }

    #[test]
    fn test_save_and_load_address() {
        let mut store = MemoryStore::new();
        store.save_local_address(Address::Node(*b"CQ")).unwrap();
        assert_eq!(store.load_local_address().unwrap(), Address::Node(*b"CQ"));
    }

    #[test]
    fn test_lowercase_bytes_are_unassigned() {
        let mut store = MemoryStore::new();
        store.image = [b'a', b'B', 0];
        assert_eq!(store.load_local_address().unwrap(), Address::Unassigned);
    }

    #[test]
    fn test_reset_pool_counter() {
        let mut store = MemoryStore::new();
        store.save_pool_counter(17).unwrap();
        store.reset_pool_counter().unwrap();
        assert_eq!(store.load_pool_counter().unwrap(), 0);
    }
}
