//! Daemon configuration.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, `RELAY_CONFIG`, or `<config_dir>/relay/relayd.toml`)
//! 3. Environment (`RELAY_BIND`)
//! 4. Command-line flags
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//! max_message_size = 1048576
//! outbound_buffer = 64
//!
//! [router]
//! room_source = "attribute"
//! welcome = true
//! announce_joins = true
//!
//! [registry]
//! empty_rooms = "retain"
//! command_buffer = 256
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::{EmptyRoomPolicy, COMMAND_BUFFER};
use crate::router::RouterConfig;
use crate::server::ServerConfig;

/// Environment variable overriding the listen address
pub const ENV_BIND: &str = "RELAY_BIND";

/// Environment variable naming the config file
pub const ENV_CONFIG: &str = "RELAY_CONFIG";

/// Registry actor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub empty_rooms: EmptyRoomPolicy,

    /// Mailbox capacity of the registry actor
    pub command_buffer: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            empty_rooms: EmptyRoomPolicy::default(),
            command_buffer: COMMAND_BUFFER,
        }
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub registry: RegistrySettings,
}

impl RelayConfig {
    /// Parses a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Loads `path` if given, otherwise the default file if it exists,
    /// otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/relay/relayd.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("relay").join("relayd.toml"))
    }

    /// Replaces the listen address with `bind`.
    pub fn set_bind(&mut self, bind: &str) -> Result<(), ConfigError> {
        self.server.bind = bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBind(bind.to_string()))?;
        Ok(())
    }

    /// Applies `RELAY_BIND` when set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which stands in for the process
    /// environment.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND).filter(|b| !b.trim().is_empty()) {
            self.set_bind(&bind)?;
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Invalid bind address: {0}")]
    InvalidBind(String),
}
