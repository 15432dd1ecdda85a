//! Environment configuration for live bindings.
//!
//! Read from process environment variables, optionally seeded from a `.env`
//! file found from the working directory upwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default request timeout for live HTTP verbs.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default connection string for the live key-value store.
pub const DEFAULT_KV_URL: &str = "sqlite:hermetic-kv.db";

pub const HTTP_TIMEOUT_VAR: &str = "HERMETIC_HTTP_TIMEOUT_SECS";
pub const HTTP_USER_AGENT_VAR: &str = "HERMETIC_HTTP_USER_AGENT";
pub const KV_URL_VAR: &str = "HERMETIC_KV_URL";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("Cannot read env file: {0}")]
    EnvFile(String),
}

/// Settings used when building live bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub http_timeout: Duration,
    pub user_agent: String,
    pub kv_url: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            kv_url: DEFAULT_KV_URL.to_string(),
        }
    }
}

impl EnvironmentConfig {
    /// Load `.env` if present, then read process environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings from a specific env file. Process variables win over the
    /// file; the process environment is left untouched.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<Result<HashMap<String, String>, _>>())
            .map_err(|e| ConfigError::EnvFile(format!("{}: {e}", path.display())))?;

        Self::from_lookup(|var| std::env::var(var).ok().or_else(|| file_vars.get(var).cloned()))
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let http_timeout = match non_empty(HTTP_TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    var: HTTP_TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: HTTP_TIMEOUT_VAR,
                        value: raw,
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            http_timeout,
            user_agent: non_empty(HTTP_USER_AGENT_VAR).unwrap_or_else(default_user_agent),
            kv_url: non_empty(KV_URL_VAR).unwrap_or_else(|| DEFAULT_KV_URL.to_string()),
        })
    }
}

fn default_user_agent() -> String {
    format!("hermetic/{}", env!("CARGO_PKG_VERSION"))
}

/// Load the nearest `.env` into the process environment. Variables already
/// set are kept. Returns the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable .env");
            None
        }
    }
}
