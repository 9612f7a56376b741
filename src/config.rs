//! Configuration for Stockroom
//!
//! CLI arguments with environment variable fallbacks. Read once at startup;
//! the connection target and retry policy are reused for every attempt.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::lifecycle::{BackoffPolicy, SupervisorConfig};

/// Stockroom - inventory tracking service
#[derive(Parser, Debug, Clone)]
#[command(name = "stockroom")]
#[command(about = "Inventory tracking service with a lazily connected database")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "stockroom")]
    pub mongodb_db: String,

    /// Connection retry policy
    #[command(flatten)]
    pub retry: RetryArgs,

    /// E-mail of the administrative account seeded on first connect
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@stockroom.local")]
    pub admin_email: String,

    /// Password for the seeded account (random when unset)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

/// Database connection retry settings
#[derive(Parser, Debug, Clone)]
pub struct RetryArgs {
    /// Connect attempts per sequence before cooling down
    #[arg(long = "db-max-attempts", env = "DB_MAX_ATTEMPTS", default_value = "20")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds
    #[arg(long = "db-backoff-base-ms", env = "DB_BACKOFF_BASE_MS", default_value = "2000")]
    pub backoff_base_ms: u64,

    /// Growth factor between consecutive delays
    #[arg(long = "db-backoff-factor", env = "DB_BACKOFF_FACTOR", default_value = "1.5")]
    pub backoff_factor: f64,

    /// Upper bound on the delay before jitter, in milliseconds
    #[arg(long = "db-backoff-cap-ms", env = "DB_BACKOFF_CAP_MS", default_value = "30000")]
    pub backoff_cap_ms: u64,

    /// Pause after an exhausted sequence, in milliseconds
    #[arg(long = "db-cooldown-ms", env = "DB_COOLDOWN_MS", default_value = "10000")]
    pub cooldown_ms: u64,

    /// How long a data call waits for the database, in milliseconds
    #[arg(long = "db-wait-timeout-ms", env = "DB_WAIT_TIMEOUT_MS", default_value = "30000")]
    pub wait_timeout_ms: u64,
}

impl Args {
    /// Validate settings that clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        let retry = &self.retry;

        if retry.max_attempts == 0 {
            return Err("DB_MAX_ATTEMPTS must be at least 1".to_string());
        }

        if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
            return Err("DB_BACKOFF_FACTOR must be a number >= 1.0".to_string());
        }

        if retry.backoff_cap_ms < retry.backoff_base_ms {
            return Err("DB_BACKOFF_CAP_MS must be >= DB_BACKOFF_BASE_MS".to_string());
        }

        if retry.wait_timeout_ms == 0 {
            return Err("DB_WAIT_TIMEOUT_MS must be greater than 0".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!("LOG_FORMAT must be 'text' or 'json', got '{}'", self.log_format));
        }

        Ok(())
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.retry.backoff_base_ms),
            factor: self.retry.backoff_factor,
            cap: Duration::from_millis(self.retry.backoff_cap_ms),
            ..BackoffPolicy::default()
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            max_attempts: self.retry.max_attempts,
            cooldown: Duration::from_millis(self.retry.cooldown_ms),
            backoff: self.backoff(),
        }
    }

    /// Bound on data-call waits
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.retry.wait_timeout_ms)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}
