//! Configuration module
//!
//! Handles loading and saving the host configuration for an LLAP node.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::protocol::Address;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node role and address
    #[serde(default)]
    pub node: NodeConfig,

    /// Startup handshake
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Persistent state
    #[serde(default)]
    pub store: StoreConfig,

    /// Serial link
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Act as the network coordinator (address `AA`)
    #[serde(default)]
    pub coordinator: bool,
    /// Fixed address; when unset the stored address is used and a new one
    /// is requested from the coordinator if there is none
    pub address: Option<Address>,
}

/// Handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// STARTED attempts while waiting for an ACK
    #[serde(default = "default_attempts")]
    pub attempts: u8,
    /// Delay between attempts (ms)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_attempts() -> u8 {
    5
}

fn default_retry_delay() -> u64 {
    200
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl HandshakeConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            handshake_attempts: self.attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// State file (defaults to the user data directory)
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("llapmesh/state.toml"))
                .unwrap_or_else(|| PathBuf::from("./llapmesh-state.toml"))
        })
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Serial device; stdin/stdout when unset
    pub device: Option<PathBuf>,
    /// Main loop poll interval (ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device: None,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("llapmesh/config.toml")),
            Some(PathBuf::from("./llapmesh.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        node: NodeConfig {
            coordinator: false,
            address: Some(Address::Node(*b"BC")),
        },
        store: StoreConfig {
            path: Some(PathBuf::from("/var/lib/llapmesh/state.toml")),
        },
        transport: TransportConfig {
            device: Some(PathBuf::from("/dev/ttyAMA0")),
            ..Default::default()
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.node.coordinator);
        assert_eq!(config.handshake.attempts, 5);
        assert_eq!(
            config.handshake.engine_config().retry_delay,
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.node.coordinator = true;
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert!(loaded.node.coordinator);
        assert_eq!(loaded.transport.poll_interval_ms, 10);
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.node.address, Some(Address::Node(*b"BC")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[node]\naddress = \"DE\"\n").unwrap();
        assert_eq!(parsed.node.address, Some(Address::Node(*b"DE")));
        assert_eq!(parsed.handshake.retry_delay_ms, 200);
        assert!(parsed.transport.device.is_none());
    }

    #[test]
    fn test_invalid_address_rejected() {
        let parsed: Result<Config, _> = toml::from_str("[node]\naddress = \"d1\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/llapmesh.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
