//! Client configuration.
//!
//! Layers, later ones winning: defaults, TOML file (every field optional),
//! `OPTIQUEUE_*` environment, command-line [`ConfigOverrides`]. Validation
//! runs once, on the merged result:
//!
//! ```toml
//! base_url = "http://127.0.0.1:5000"
//! poll_interval_ms = 2000
//! query_timeout_ms = 10000
//! request_timeout_ms = 30000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_BASE_URL: &str = "OPTIQUEUE_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "OPTIQUEUE_POLL_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the optimization backend.
    pub base_url: String,

    /// Period of the reconciliation loop.
    pub poll_interval_ms: u64,

    /// Upper bound for one status query inside a tick.
    pub query_timeout_ms: u64,

    /// HTTP request timeout used by the HTTP adapter.
    pub request_timeout_ms: u64,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 2000,
            query_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read_file(path.as_ref())?)
    }

    /// Merge file, environment and `overrides`, then validate the result.
    ///
    /// Intermediate layers are not validated, so a bad value in one layer
    /// can be corrected by a later one.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let base: Self = match path {
            Some(path) => toml::from_str(&read_file(path)?)?,
            None => Self::default(),
        };
        base.layered(|key| std::env::var(key).ok(), overrides)
    }

    fn layered(
        self,
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = self.apply_env(lookup)?;
        if let Some(url) = &overrides.base_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = overrides.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = ms.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: format!("{ms:?}: {e}"),
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("{url:?} is not an http(s) URL"),
            });
        }
        for (field, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("query_timeout_ms", self.query_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}
