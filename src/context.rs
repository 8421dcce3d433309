use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::cli::{Cli, Command};
use crate::configuration::{Configuration, DbConfig, LogConfig, WebConfig};

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let seed_cmd = matches!(cli.cmd, Some(Command::InitDb { seed: true }));
        let config = Configuration {
            db: DbConfig {
                uri: cli.db_uri.clone(),
                timeout: Duration::from_millis(cli.db_timeout_ms),
                init: cli.init_db || cli.cmd.is_some(),
                seed: cli.seed_dictionaries || seed_cmd,
            },
            web: WebConfig {
                listen: cli.listen,
                request_timeout: Duration::from_millis(cli.request_timeout_ms),
                max_body_bytes: cli.max_body_bytes,
                update_concurrency: cli.update_concurrency,
            },
            log: LogConfig {
                format: cli.log_format,
                file: cli.log_file.as_ref().map(PathBuf::from),
            },
        };
        config.validate()?;
        Ok(Self { config })
    }
}
