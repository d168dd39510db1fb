//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Engine configuration, read from `WIZARD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// libSQL database file for suspended runs. `None` keeps runs in memory.
    pub db_path: Option<PathBuf>,
    /// Marketplace API base URL. `None` records submissions locally.
    pub submit_url: Option<String>,
    /// Per-request timeout for submissions.
    pub submit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            submit_url: None,
            submit_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let db_path = get("WIZARD_DB_PATH").map(PathBuf::from);

        let submit_url = get("WIZARD_SUBMIT_URL");
        let not_http = |url: &&str| !(url.starts_with("http://") || url.starts_with("https://"));
        if let Some(url) = submit_url.as_deref().filter(not_http) {
            return Err(ConfigError::InvalidValue {
                key: "WIZARD_SUBMIT_URL".into(),
                message: format!("expected an http(s) URL, got {url}"),
            });
        }

        let submit_timeout = match get("WIZARD_SUBMIT_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "WIZARD_SUBMIT_TIMEOUT_SECS".into(),
                        message: format!("expected a positive number of seconds, got {raw}"),
                    });
                }
            },
            None => defaults.submit_timeout,
        };

        Ok(Self {
            db_path,
            submit_url,
            submit_timeout,
        })
    }
}
