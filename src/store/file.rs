//! File-backed store
//!
//! Keeps the node state in a small TOML file that is rewritten on every
//! save.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AddressStore, StoreError, StoreResult};
use crate::protocol::Address;

/// On-disk layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredState {
    /// Raw address text, validated on load
    #[serde(default)]
    local_address: String,
    #[serde(default)]
    pool_counter: u8,
}

/// Store persisted to a TOML file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: StoredState,
}

impl FileStore {
    /// Open the store at `path`; a missing file reads as the erased state
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&contents)?
        } else {
            StoredState::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> StoreResult<()> {
        let contents = toml::to_string_pretty(&self.state)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(&self.path, contents).map_err(io_err)?;
        Ok(())
    }
}

impl AddressStore for FileStore {
    fn load_local_address(&mut self) -> StoreResult<Address> {
        let bytes: Option<[u8; 2]> = self.state.local_address.as_bytes().try_into().ok();
        match bytes.and_then(Address::node) {
            Some(address) => Ok(address),
            None => {
                self.save_local_address(Address::Unassigned)?;
                Ok(Address::Unassigned)
            }
        }
    }

    fn save_local_address(&mut self, address: Address) -> StoreResult<()> {
        self.state.local_address = address.to_string();
        self.persist()
    }

    fn load_pool_counter(&mut self) -> StoreResult<u8> {
        Ok(self.state.pool_counter)
    }

    fn save_pool_counter(&mut self, counter: u8) -> StoreResult<()> {
        self.state.pool_counter = counter;
        self.persist()
    }
}
