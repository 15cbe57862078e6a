//! Configuration management system for peersync
//!
//! This crate provides the configuration surface for peersync, supporting
//! YAML and TOML configuration files, validation, and sensible defaults for
//! every option.
//!
//! # Examples
//!
//! ```rust
//! use peersync_config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.sync.marker_dir, ".peersync");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for peersync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Change-propagation behavior
    #[serde(default)]
    pub sync: SyncConfig,
    /// Peer link configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sync.chunk_size == 0 {
            return Err(ConfigError::validation("chunk_size must be non-zero"));
        }
        if self.sync.marker_dir.is_empty() {
            return Err(ConfigError::validation("marker_dir must not be empty"));
        }
        if self.sync.marker_dir.contains(['/', '\\']) {
            return Err(ConfigError::validation(
                "marker_dir must be a single path component",
            ));
        }
        if self.network.listen_addr.is_empty() || self.network.peer_addr.is_empty() {
            return Err(ConfigError::validation(
                "listen_addr and peer_addr must not be empty",
            ));
        }
        Ok(())
    }
}

/// Change-propagation behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum elapsed time between two content checks for the same path
    #[serde(default = "default_debounce_window")]
    pub debounce_window: Duration,
    /// Wait after a sync completes before its suppression marker is cleared
    #[serde(default = "default_settle_delay")]
    pub settle_delay: Duration,
    /// Name of the reserved marker subdirectory under the sync root
    #[serde(default = "default_marker_dir")]
    pub marker_dir: String,
    /// Chunk size for streaming file payloads
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window: default_debounce_window(),
            settle_delay: default_settle_delay(),
            marker_dir: default_marker_dir(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Peer link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Local listener bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Address of the peer node's listener
    #[serde(default = "default_peer_addr")]
    pub peer_addr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            peer_addr: default_peer_addr(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable colored output
    #[serde(default = "default_colored_output")]
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored_output: default_colored_output(),
        }
    }
}

fn default_debounce_window() -> Duration {
    Duration::from_secs(1)
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_marker_dir() -> String {
    ".peersync".to_string()
}

fn default_chunk_size() -> usize {
    8192
}

fn default_listen_addr() -> String {
    "0.0.0.0:9345".to_string()
}

fn default_peer_addr() -> String {
    "127.0.0.1:9345".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_colored_output() -> bool {
    true
}
