//! Server configuration
//!
//! Defaults, then an optional YAML file named by `SENTINEL_CONFIG`, then
//! per-key environment overrides.

use sentinel_core::RegistryConfig;
use sentinel_sim::SimulatorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const CONFIG_FILE_VAR: &str = "SENTINEL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONFIG/IO: cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CONFIG/YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CONFIG/VALUE: {var}={value:?} is not valid")]
    InvalidValue { var: &'static str, value: String },

    #[error("CONFIG/INVALID: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub recovery_delay_min_ms: u64,
    pub recovery_delay_max_ms: u64,
    pub max_pending_recoveries: usize,
    pub allow_duplicate_registration: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let sim = SimulatorConfig::default();
        Self {
            addr: "0.0.0.0:3000".to_string(),
            recovery_delay_min_ms: sim.recovery_delay_min_ms,
            recovery_delay_max_ms: sim.recovery_delay_max_ms,
            max_pending_recoveries: sim.max_pending_recoveries,
            allow_duplicate_registration: RegistryConfig::default().allow_duplicates,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SENTINEL_ADDR") {
            self.addr = addr;
        }
        if let Some(v) = parse_var(lookup, "SENTINEL_RECOVERY_MIN_MS")? {
            self.recovery_delay_min_ms = v;
        }
        if let Some(v) = parse_var(lookup, "SENTINEL_RECOVERY_MAX_MS")? {
            self.recovery_delay_max_ms = v;
        }
        if let Some(v) = parse_var(lookup, "SENTINEL_MAX_PENDING_RECOVERIES")? {
            self.max_pending_recoveries = v;
        }
        if let Some(v) = parse_var(lookup, "SENTINEL_ALLOW_DUPLICATES")? {
            self.allow_duplicate_registration = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("listen address is empty".to_string()));
        }
        self.simulator()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            recovery_delay_min_ms: self.recovery_delay_min_ms,
            recovery_delay_max_ms: self.recovery_delay_max_ms,
            max_pending_recoveries: self.max_pending_recoveries,
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            allow_duplicates: self.allow_duplicate_registration,
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
