//! Chainbind Configuration Module
//!
//! Settings of the contract registry, logging and the chain clients, read from
//! a TOML file. Every section and every key is optional; absent values take
//! the defaults below.
//!
//! ```toml
//! [registry]
//! provider = "filesystem"
//! base_path = "contracts"
//!
//! [ethereum]
//! endpoint_address = "http://localhost:8545"
//!
//! [ethereum.polling]
//! attempts = 40
//! ```

#![warn(missing_docs)]

/// Logging initialisation
pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default pause between receipt queries
pub const DEFAULT_SLEEP_DURATION_MS: u64 = 15_000;
/// Default number of receipt queries
pub const DEFAULT_POLLING_ATTEMPTS: u32 = 40;
/// Default number of confirmation blocks
pub const DEFAULT_CONFIRMATION_BLOCKS: u64 = 12;
/// Default time between blocks
pub const DEFAULT_BLOCK_TIME_MS: u64 = 15_000;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The settings are not valid TOML or do not match the expected shape.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting holds an unusable value.
    #[error("Invalid setting '{key}': {message}")]
    Invalid {
        /// Dotted key of the setting.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// The logging subscriber could not be installed.
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

impl ConfigError {
    fn invalid<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Where contract bindings are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryProvider {
    /// One JSON file per binding below `base_path`.
    #[default]
    Filesystem,
    /// Process memory only.
    Memory,
}

/// Registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Registry provider
    pub provider: RegistryProvider,
    /// Directory of the filesystem registry
    pub base_path: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            provider: RegistryProvider::Filesystem,
            base_path: PathBuf::from("contracts"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `chainbind_fabric=debug`
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Wallet used to sign Ethereum transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSettings {
    /// Chain id transactions are signed for
    pub network_id: Option<u64>,
    /// Wallet file
    pub path: Option<PathBuf>,
    /// Wallet password
    pub password: Option<String>,
}

/// Account calls are sent from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Sender address
    pub address: Option<String>,
}

/// Receipt polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Pause between receipt queries in milliseconds
    pub sleep_duration_ms: u64,
    /// Number of receipt queries
    pub attempts: u32,
    /// Blocks required on top of the receipt's block
    pub confirmation_blocks: u64,
    /// Expected time between blocks in milliseconds
    pub block_time_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            sleep_duration_ms: DEFAULT_SLEEP_DURATION_MS,
            attempts: DEFAULT_POLLING_ATTEMPTS,
            confirmation_blocks: DEFAULT_CONFIRMATION_BLOCKS,
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
        }
    }
}

impl PollingSettings {
    /// Pause between receipt queries.
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_millis(self.sleep_duration_ms)
    }

    /// Expected time between blocks.
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

/// Ethereum settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumSettings {
    /// JSON-RPC endpoint
    pub endpoint_address: Option<String>,
    /// HTTP timeout in milliseconds
    pub http_timeout_ms: Option<u64>,
    /// Signing wallet
    pub wallet: WalletSettings,
    /// Sender account
    pub client: ClientSettings,
    /// Receipt polling
    pub polling: PollingSettings,
}

/// Quorum sender and privacy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumClientSettings {
    /// Sender address
    pub address: Option<String>,
    /// Public key of the sending enclave
    pub private_from: Option<String>,
    /// Default recipients of private transactions
    pub private_for: Vec<String>,
}

/// Quorum settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumSettings {
    /// JSON-RPC endpoint
    pub endpoint_address: Option<String>,
    /// HTTP timeout in milliseconds
    pub http_timeout_ms: Option<u64>,
    /// Sender and privacy settings
    pub client: QuorumClientSettings,
}

/// Identity Fabric proposals are signed with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricUserSettings {
    /// User name
    pub name: Option<String>,
    /// Roles
    pub roles: Vec<String>,
    /// Account
    pub account: Option<String>,
    /// Affiliation
    pub affiliation: Option<String>,
    /// Membership service provider id
    pub msp_id: Option<String>,
    /// PEM certificate file
    pub certificate_file: Option<PathBuf>,
    /// PEM private key file
    pub private_key_file: Option<PathBuf>,
}

/// Fabric settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricSettings {
    /// Network configuration file of the Fabric SDK
    pub network_config_file: Option<PathBuf>,
    /// Channel name
    pub channel: Option<String>,
    /// Signing identity
    pub user: FabricUserSettings,
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Contract registry
    pub registry: RegistrySettings,
    /// Logging
    pub logging: LoggingSettings,
    /// Ethereum client
    pub ethereum: EthereumSettings,
    /// Quorum client
    pub quorum: QuorumSettings,
    /// Fabric client
    pub fabric: FabricSettings,
}

impl Settings {
    /// Reads and validates settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.provider == RegistryProvider::Filesystem && self.registry.base_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("registry.base_path", "cannot be empty"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "cannot be empty"));
        }

        let polling = &self.ethereum.polling;
        if polling.attempts == 0 {
            return Err(ConfigError::invalid("ethereum.polling.attempts", "must be greater than zero"));
        }
        if polling.sleep_duration_ms == 0 {
            return Err(ConfigError::invalid(
                "ethereum.polling.sleep_duration_ms",
                "must be greater than zero",
            ));
        }
        if polling.confirmation_blocks > 0 && polling.block_time_ms == 0 {
            return Err(ConfigError::invalid(
                "ethereum.polling.block_time_ms",
                "must be greater than zero when confirmation blocks are awaited",
            ));
        }

        for (key, timeout) in [
            ("ethereum.http_timeout_ms", self.ethereum.http_timeout_ms),
            ("quorum.http_timeout_ms", self.quorum.http_timeout_ms),
        ] {
            if timeout == Some(0) {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
        }

        let user = &self.fabric.user;
        if user.certificate_file.is_some() != user.private_key_file.is_some() {
            return Err(ConfigError::invalid(
                "fabric.user",
                "certificate_file and private_key_file must be set together",
            ));
        }
        Ok(())
    }
}
