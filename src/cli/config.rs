//! Configuration file
//!
//! A single JSON object. Every field is optional:
//!
//! ```json
//! {
//!   "ceph_conf": "/etc/ceph/ceph.conf",
//!   "client_id": "admin",
//!   "pool": "rbd",
//!   "poll_attempts": 30,
//!   "poll_interval_ms": 2000
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::mirror::{PollConfig, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Cluster configuration file (default: librados search path)
    #[serde(default)]
    pub ceph_conf: Option<PathBuf>,

    /// Client name without the `client.` prefix
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Pool used when `--pool` is not given
    #[serde(default)]
    pub pool: Option<String>,

    /// Status reads before `wait` gives up
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Pause between status reads
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_client_id() -> String {
    "admin".to_string()
}
fn default_poll_attempts() -> u32 {
    DEFAULT_POLL_ATTEMPTS
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ceph_conf: None,
            client_id: default_client_id(),
            pool: None,
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(CliError::config_error("client_id must not be empty"));
        }

        if self.poll_attempts == 0 {
            return Err(CliError::config_error("poll_attempts must be > 0"));
        }

        if let Some(pool) = &self.pool {
            if pool.is_empty() {
                return Err(CliError::config_error("pool must not be empty"));
            }
        }

        Ok(())
    }

    /// Pool to operate on: the command line wins over the file.
    pub fn resolve_pool(&self, cli_pool: Option<&str>) -> CliResult<String> {
        cli_pool
            .or(self.pool.as_deref())
            .filter(|pool| !pool.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CliError::config_error("no pool given (use --pool or set 'pool')"))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.poll_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}
