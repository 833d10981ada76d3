//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{LedgerError, LedgerResult};

pub const DEFAULT_STORE_PATH: &str = "accounts.json";
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 2_000;

/// What a mutating operation does when the store rejects the write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceFailurePolicy {
    /// Log the failure and keep the in-memory mutation
    #[default]
    Continue,
    /// Restore the previous balances and report the failure
    Reject,
}

/// Log output format for the process subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Ledger service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Location of the durable account document
    pub store_path: PathBuf,
    /// Upper bound on a single subscriber delivery, in milliseconds
    pub notify_timeout_ms: u64,
    pub persistence_failure: PersistenceFailurePolicy,
    pub log_format: LogFormat,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            notify_timeout_ms: DEFAULT_NOTIFY_TIMEOUT_MS,
            persistence_failure: PersistenceFailurePolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl LedgerConfig {
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// Parse a JSON configuration document; missing keys take defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Defaults overlaid with `LEDGER_*` environment variables
    pub fn from_env() -> LedgerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> LedgerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("LEDGER_STORE_PATH") {
            if path.trim().is_empty() {
                return Err(LedgerError::Config(
                    "LEDGER_STORE_PATH cannot be empty".to_string(),
                ));
            }
            config.store_path = PathBuf::from(path);
        }

        if let Some(timeout) = lookup("LEDGER_NOTIFY_TIMEOUT_MS") {
            config.notify_timeout_ms = timeout.trim().parse().map_err(|_| {
                LedgerError::Config(format!(
                    "LEDGER_NOTIFY_TIMEOUT_MS must be a whole number of milliseconds, got '{}'",
                    timeout
                ))
            })?;
        }

        if let Some(policy) = lookup("LEDGER_PERSISTENCE_FAILURE") {
            config.persistence_failure = match policy.trim().to_ascii_lowercase().as_str() {
                "continue" => PersistenceFailurePolicy::Continue,
                "reject" => PersistenceFailurePolicy::Reject,
                other => {
                    return Err(LedgerError::Config(format!(
                        "LEDGER_PERSISTENCE_FAILURE must be 'continue' or 'reject', got '{}'",
                        other
                    )))
                }
            };
        }

        if let Some(format) = lookup("LEDGER_LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "plain" => LogFormat::Plain,
                "json" => LogFormat::Json,
                other => {
                    return Err(LedgerError::Config(format!(
                        "LEDGER_LOG_FORMAT must be 'plain' or 'json', got '{}'",
                        other
                    )))
                }
            };
        }

        Ok(config)
    }
}
