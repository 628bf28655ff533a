//! Configuration defaults and loading.
//!
//! Defaults live in the [`defaults`] module so every crate shares the same
//! values. A [`DucoConfig`] is read from TOML, then environment variables
//! override individual fields:
//!
//! ```toml
//! slave_id = 1
//! update_interval_secs = 15
//!
//! [modbus]
//! host = "192.168.1.50"
//! port = 502
//! timeout_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default values.
pub mod defaults {
    /// Refresh period of the coordinator
    pub const UPDATE_INTERVAL_SECS: u64 = 15;
    /// Modbus TCP port
    pub const MODBUS_PORT: u16 = 502;
    pub const MODBUS_HOST: &str = "127.0.0.1";
    /// Per-request timeout
    pub const TIMEOUT_MS: u64 = 5000;
    pub const SLAVE_ID: u8 = 1;
    /// Highest slave id a Duco box can be configured with
    pub const MAX_SLAVE_ID: u8 = 32;
}

/// Environment variable names.
pub mod env_vars {
    pub const CONFIG_PATH: &str = "DUCO_CONFIG";
    pub const MODBUS_HOST: &str = "DUCO_MODBUS_HOST";
    pub const MODBUS_PORT: &str = "DUCO_MODBUS_PORT";
    pub const SLAVE_ID: &str = "DUCO_SLAVE_ID";
    pub const UPDATE_INTERVAL_SECS: &str = "DUCO_UPDATE_INTERVAL_SECS";
    /// Emit JSON log lines instead of the compact format
    pub const LOG_JSON: &str = "DUCO_LOG_JSON";

    /// Parse an environment variable, ignoring unset or malformed values.
    pub fn parse<T: std::str::FromStr>(name: &str) -> Option<T> {
        std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
    }
}

fn default_slave_id() -> u8 {
    defaults::SLAVE_ID
}

fn default_update_interval() -> u64 {
    defaults::UPDATE_INTERVAL_SECS
}

fn default_host() -> String {
    defaults::MODBUS_HOST.to_string()
}

fn default_port() -> u16 {
    defaults::MODBUS_PORT
}

fn default_timeout() -> u64 {
    defaults::TIMEOUT_MS
}

/// Modbus TCP connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Gateway IP address or hostname
    #[serde(default = "default_host")]
    pub host: String,

    /// Modbus TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout(),
        }
    }
}

impl ModbusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `host:port` for connecting.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Integration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DucoConfig {
    /// Modbus slave/unit id of the Duco box
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    /// Refresh period in seconds
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Use the in-memory fake transport instead of the bus
    #[serde(default)]
    pub fake: bool,

    #[serde(default)]
    pub modbus: ModbusConfig,
}

impl Default for DucoConfig {
    fn default() -> Self {
        Self {
            slave_id: default_slave_id(),
            update_interval_secs: default_update_interval(),
            fake: false,
            modbus: ModbusConfig::default(),
        }
    }
}

impl DucoConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Override fields from `DUCO_*` environment variables.
    pub fn apply_env(mut self) -> Self {
        if let Ok(host) = std::env::var(env_vars::MODBUS_HOST) {
            self.modbus.host = host;
        }
        if let Some(port) = env_vars::parse(env_vars::MODBUS_PORT) {
            self.modbus.port = port;
        }
        if let Some(slave_id) = env_vars::parse(env_vars::SLAVE_ID) {
            self.slave_id = slave_id;
        }
        if let Some(secs) = env_vars::parse(env_vars::UPDATE_INTERVAL_SECS) {
            self.update_interval_secs = secs;
        }
        self
    }

    /// Set the slave id.
    pub fn with_slave_id(mut self, slave_id: u8) -> Self {
        self.slave_id = slave_id;
        self
    }

    /// Set the refresh period.
    pub fn with_update_interval(mut self, secs: u64) -> Self {
        self.update_interval_secs = secs;
        self
    }

    /// Use the fake transport.
    pub fn with_fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Reject values the box or the coordinator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.slave_id > defaults::MAX_SLAVE_ID {
            return Err(Error::Config(format!(
                "slave_id {} out of range 0..={}",
                self.slave_id,
                defaults::MAX_SLAVE_ID
            )));
        }
        if self.update_interval_secs == 0 {
            return Err(Error::Config(
                "update_interval_secs must be greater than zero".to_string(),
            ));
        }
        if !self.fake && self.modbus.host.trim().is_empty() {
            return Err(Error::Config("modbus.host must not be empty".to_string()));
        }
        Ok(())
    }
}
