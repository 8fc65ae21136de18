//! Server configuration.
//!
//! Every field has a default, so an empty TOML file is a valid configuration:
//!
//! ```toml
//! bind = "0.0.0.0:8000"
//! mode = "file"          # or "proxy"
//! root = "./public"
//! keep_alive = true
//! gzip = false
//! compression_level = 9
//! chunk_threshold = 0
//! connect_timeout_ms = 10000
//! ```

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ferry_http::connection::ConnectionConfig;
use ferry_http::negotiate::EncodingConfig;
use serde::Deserialize;
use thiserror::Error;

const MAX_COMPRESSION_LEVEL: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// serve files below `root`
    #[default]
    File,
    /// forward proxy with CONNECT tunnels
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub mode: Mode,
    pub root: PathBuf,
    pub keep_alive: bool,
    pub gzip: bool,
    pub compression_level: u32,
    pub chunk_threshold: usize,
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_owned(),
            mode: Mode::File,
            root: PathBuf::from("."),
            keep_alive: true,
            gzip: false,
            compression_level: MAX_COMPRESSION_LEVEL,
            chunk_threshold: 0,
            connect_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub fn invalid<S: ToString>(str: S) -> Self {
        Self::Invalid { reason: str.to_string() }
    }
}

impl ServerConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file without validating it.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        Self::from_toml(&content)
    }

    /// Parses without validating; values may still be overridden before use.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address()?;

        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ConfigError::invalid(format!(
                "compression_level {} is above {MAX_COMPRESSION_LEVEL}",
                self.compression_level
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid("connect_timeout_ms must be positive"));
        }
        if self.mode == Mode::File && !self.root.is_dir() {
            return Err(ConfigError::invalid(format!("root {} is not a directory", self.root.display())));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|e| ConfigError::invalid(format!("bind address {}: {e}", self.bind)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn encoding(&self) -> EncodingConfig {
        EncodingConfig::default()
            .with_gzip(self.gzip)
            .with_compression_level(self.compression_level)
            .with_chunk_threshold(self.chunk_threshold)
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig::default().with_keep_alive(self.keep_alive).with_encoding(self.encoding())
    }
}
