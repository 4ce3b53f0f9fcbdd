//! Bridge configuration.
//!
//! Loaded from TOML or built in code. Every section is optional:
//!
//! ```toml
//! [log]
//! level = "debug"
//! format = "json"
//!
//! [dispatch]
//! trace_invocations = true
//!
//! [registry]
//! refresh_on_init = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use dynbridge_dispatch::DispatchOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Log each foreign call at debug level.
    #[serde(default)]
    pub trace_invocations: bool,

    /// Resolve missing attributes against registered extension methods.
    #[serde(default)]
    pub extension_methods: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Populate the type registry when the bridge is created.
    #[serde(default = "default_true")]
    pub refresh_on_init: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_on_init: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DYNBRIDGE_LOG_LEVEL` and `DYNBRIDGE_LOG_JSON` on top of this
    /// configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("DYNBRIDGE_LOG_LEVEL") {
            self.log.level = level.to_lowercase();
        }
        if std::env::var("DYNBRIDGE_LOG_JSON").is_ok() {
            self.log.format = LogFormat::Json;
        }
        self
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            trace_invocations: self.dispatch.trace_invocations,
        }
    }
}
