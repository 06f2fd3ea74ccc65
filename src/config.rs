//! Client configuration.
//!
//! Resolution order: `CLI_`-prefixed environment variables → JSON config
//! file → defaults. The file is optional; a missing file just means env
//! and defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::error::Result;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Agency/session identifier sent in every request header.
    pub agency_id: u32,
    /// Server `host:port` address.
    pub server_address: String,
    /// Per-chunk batching limits.
    pub batch: BatchConfig,
    /// Deadline for each socket read and write, in milliseconds.
    pub socket_timeout_ms: u64,
    /// Readiness poll backoff parameters.
    pub backoff: BackoffConfig,
}

/// Per-chunk limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum records per chunk.
    pub max_count: usize,
    /// Maximum chunk bytes, per-record length prefixes included.
    pub max_size: usize,
}

/// Readiness poll backoff parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the second attempt, in milliseconds.
    pub initial_ms: u64,
    /// Maximum attempts.
    pub retries: u32,
    /// Delay multiplier between attempts.
    pub factor: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agency_id: 1,
            server_address: "127.0.0.1:12345".to_string(),
            batch: BatchConfig::default(),
            socket_timeout_ms: 5000,
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_count: 10,
            max_size: 8 * 1024,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            retries: 10,
            factor: 2,
        }
    }
}

impl ClientConfig {
    /// Load configuration: file (if present) overridden by environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                serde_json::from_str(&text)?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `CLI_*` environment variables. Unparseable
    /// values are ignored in favor of the current value.
    pub fn apply_env(&mut self) {
        env_override("CLI_ID", &mut self.agency_id);
        if let Ok(v) = std::env::var("CLI_SERVER_ADDRESS") {
            self.server_address = v;
        }
        env_override("CLI_BATCH_MAX_COUNT", &mut self.batch.max_count);
        env_override("CLI_BATCH_MAX_SIZE", &mut self.batch.max_size);
        env_override("CLI_SOCKET_TIMEOUT_MS", &mut self.socket_timeout_ms);
        env_override("CLI_BACKOFF_INITIAL_MS", &mut self.backoff.initial_ms);
        env_override("CLI_BACKOFF_RETRIES", &mut self.backoff.retries);
        env_override("CLI_BACKOFF_FACTOR", &mut self.backoff.factor);
    }

    /// Socket deadline as a duration.
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Backoff policy for the readiness poll.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff.initial_ms),
            self.backoff.retries,
            self.backoff.factor,
        )
    }
}

fn env_override<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(value) = std::env::var(key) {
        if let Ok(parsed) = value.parse() {
            *slot = parsed;
        }
    }
}
