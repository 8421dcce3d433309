use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub uri: String,
    /// Upper bound of a single store call.
    pub timeout: Duration,
    pub init: bool,
    pub seed: bool,
}

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub listen: SocketAddr,
    /// Whole-request budget shared by every store call made for it.
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub update_concurrency: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout: Duration::from_millis(4000),
            max_body_bytes: 1 << 20,
            update_concurrency: 8,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Configuration {
    pub db: DbConfig,
    pub web: WebConfig,
    pub log: LogConfig,
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.db.uri.trim().is_empty(), "db uri must not be empty");
        ensure!(!self.db.timeout.is_zero(), "db timeout must be positive");
        ensure!(
            !self.web.request_timeout.is_zero(),
            "request timeout must be positive"
        );
        ensure!(
            self.web.update_concurrency >= 1,
            "update concurrency must be at least 1"
        );
        ensure!(self.web.max_body_bytes > 0, "max body size must be positive");
        Ok(())
    }
}
