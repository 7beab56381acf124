//! Runtime tunables for the host executor.

use std::path::Path;
use std::time::Duration;
use std::{fmt, fs, io};

use serde::Deserialize;

/// Executor settings, loadable from a TOML file. Every field has a working
/// default so embedding the executor needs no configuration at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seconds a buffered reply may wait for its fetch stage before it is
    /// reported as leaked.
    pub leak_timeout_secs: u64,
    /// Upper bound on a single reply payload in bytes; larger results are
    /// rejected instead of buffered.
    pub max_payload_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config { leak_timeout_secs: 60, max_payload_size: 256 << 20 }
    }
}

/// Failure to read or parse a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    IO(io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IO(err) => write!(f, "cannot read config: {err}"),
            ConfigError::Parse(err) => write!(f, "cannot parse config: {err}"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IO)?;
        toml::from_str(&text).map_err(ConfigError::Parse)
    }

    pub fn leak_timeout(&self) -> Duration {
        Duration::from_secs(self.leak_timeout_secs)
    }
}
