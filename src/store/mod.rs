//! Store module - Persistent node state
//!
//! Two values survive a restart: the node's own address and, on the
//! coordinator, the counter that hands out the next dynamic address.

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Address;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent storage for the local address and the address pool counter.
///
/// Writes take effect immediately; there is no transaction or rollback.
pub trait AddressStore {
    /// Load the stored address.
    ///
    /// Anything that is not two letters `A`-`Z` comes back as
    /// [`Address::Unassigned`], and the unassigned value is written back.
    fn load_local_address(&mut self) -> StoreResult<Address>;

    fn save_local_address(&mut self, address: Address) -> StoreResult<()>;

    fn load_pool_counter(&mut self) -> StoreResult<u8>;

    fn save_pool_counter(&mut self, counter: u8) -> StoreResult<()>;

    /// Start handing out addresses from the beginning of the pool again
    fn reset_pool_counter(&mut self) -> StoreResult<()> {
        self.save_pool_counter(0)
    }
}
