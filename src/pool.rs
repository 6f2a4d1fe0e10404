//! Dynamic address pool
//!
//! The coordinator hands out addresses from a fixed range of 104 codes,
//! `BA` through `EZ`: the first letter starts at `B` and advances every 26
//! allocations, the second letter cycles `A`-`Z`. A persisted counter
//! tracks the next code and wraps to zero after `EZ`.
//!
//! Wrapping does not check whether an address is still in use, so after
//! 104 allocations addresses repeat. Nothing reclaims them.

use crate::protocol::Address;
use crate::store::{AddressStore, StoreResult};

/// Number of addresses in the pool
pub const POOL_SIZE: u8 = 104;

/// First letter of the first pool address
const FIRST_LETTER: u8 = b'B';

const LETTERS: u8 = b'Z' - b'A' + 1;

/// Pool address for a counter value, reduced into range first
pub fn address_at(counter: u8) -> Address {
    let counter = counter % POOL_SIZE;
    Address::Node([FIRST_LETTER + counter / LETTERS, b'A' + counter % LETTERS])
}

/// Counter value following `counter`
pub fn next_counter(counter: u8) -> u8 {
    ((u16::from(counter % POOL_SIZE) + 1) % u16::from(POOL_SIZE)) as u8
}

/// Take the next address from the pool and persist the advanced counter
pub fn allocate<S: AddressStore + ?Sized>(store: &mut S) -> StoreResult<Address> {
    let counter = store.load_pool_counter()? % POOL_SIZE;
    let address = address_at(counter);
    let next = next_counter(counter);
    store.save_pool_counter(next)?;

    if next == 0 {
        tracing::warn!("Address pool wrapped after {}, addresses will repeat", address);
    }
    Ok(address)
}
