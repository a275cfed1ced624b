//! Server configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! bind_address = "127.0.0.1:8080"
//! workers = 32
//! base_path = "/api"
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the server listens on (e.g. `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Maximum number of requests dispatched at the same time. Handlers
    /// run on blocking threads; this bounds how many.
    pub workers: usize,

    /// Prefix applied to every registered route by [`Scanner::from_config`](crate::Scanner::from_config).
    pub base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            workers: 64,
            base_path: String::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| Error::Config(format!("bind_address `{}`: {e}", self.bind_address)))
    }

    fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_owned()));
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(Error::Config(format!("base_path `{}` must start with `/`", self.base_path)));
        }
        Ok(())
    }
}
