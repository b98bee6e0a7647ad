use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading a [`ChaincodeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for the chaincode dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaincodeConfig {
    /// Key written by the `init` operation.
    pub bootstrap_key: String,
    /// Attempts a read-modify-write makes before reporting contention.
    pub max_cas_retries: u32,
    /// When `true`, creating a project requires its sponsor (or owner) to be
    /// a registered user.
    pub require_registered_sponsor: bool,
}

impl Default for ChaincodeConfig {
    fn default() -> Self {
        Self {
            bootstrap_key: "hello_world".into(),
            max_cas_retries: 8,
            require_registered_sponsor: false,
        }
    }
}

impl ChaincodeConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bootstrap_key.is_empty() {
            return Err(ConfigError::Invalid("bootstrap_key must not be empty".into()));
        }
        if fl_types::is_reserved_key(&self.bootstrap_key) {
            return Err(ConfigError::Invalid(format!(
                "bootstrap_key {:?} falls inside a record namespace",
                self.bootstrap_key
            )));
        }
        if self.max_cas_retries == 0 {
            return Err(ConfigError::Invalid("max_cas_retries must be at least 1".into()));
        }
        Ok(())
    }
}
