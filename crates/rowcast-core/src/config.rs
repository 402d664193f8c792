//! Fetch engine configuration.
//!
//! ```toml
//! single_row_hint = "validate"
//! worker_threads = 4
//! thread_name = "rowcast-fetch"
//! stream_buffer = 128
//! ```

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::OnceLock};
use thiserror::Error as ThisError;

static GLOBAL: OnceLock<FetchConfig> = OnceLock::new();

///
/// HintPolicy
///
/// How `fetch_single` treats a query flagged as yielding at most one row.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintPolicy {
    /// Read one row and skip the many-row check.
    #[default]
    Trust,
    /// Enforce the many-row check regardless of the hint.
    Validate,
}

///
/// FetchConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub single_row_hint: HintPolicy,
    pub worker_threads: usize,
    pub thread_name: String,
    pub stream_buffer: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            single_row_hint: HintPolicy::Trust,
            worker_threads: 2,
            thread_name: "rowcast-worker".to_string(),
            stream_buffer: 64,
        }
    }
}

impl FetchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid("worker_threads must be greater than zero"));
        }
        if self.stream_buffer == 0 {
            return Err(ConfigError::Invalid("stream_buffer must be greater than zero"));
        }
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid("thread_name must not be empty"));
        }

        Ok(())
    }
}

///
/// ConfigError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(&'static str),

    #[error("process config already installed")]
    AlreadyInstalled,
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Config, err.to_string())
    }
}

/// Install the process-wide default. Succeeds at most once, and only before
/// the first `global()` read.
pub fn install(config: FetchConfig) -> Result<(), ConfigError> {
    config.validate()?;

    GLOBAL
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)
}

/// Process-wide default, falling back to `FetchConfig::default()`.
#[must_use]
pub fn global() -> &'static FetchConfig {
    GLOBAL.get_or_init(FetchConfig::default)
}

///
/// TESTS
///
