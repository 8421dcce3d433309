use clap::Parser;
use std::env;

use crate::cli::command::Command;
use crate::configuration::LogFormat;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serve the cat-and-dog registry lookup tables over HTTP",
    long_about = "A small HTTP service over SQLite for document types, animal types and persons.",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[arg(
        long = "db-uri",
        env = "CATANDDOG_DB_URI",
        value_name = "URI",
        help = "SQLite database path or file: URI"
    )]
    pub db_uri: String,

    #[arg(
        long = "db-timeout-ms",
        env = "CATANDDOG_DB_TIMEOUT_MS",
        default_value_t = 1000u64,
        value_name = "MS",
        help = "Upper bound of a single database call"
    )]
    pub db_timeout_ms: u64,

    #[arg(
        long = "init-db",
        env = "CATANDDOG_INIT_DB",
        default_value_t = false,
        help = "Create the database file and schema if they do not exist"
    )]
    pub init_db: bool,

    #[arg(
        long = "seed-dictionaries",
        env = "CATANDDOG_SEED_DICTIONARIES",
        default_value_t = false,
        help = "Reset document and animal types to the default dictionaries at startup"
    )]
    pub seed_dictionaries: bool,

    #[arg(
        long,
        env = "CATANDDOG_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8080",
        help = "HTTP listen address (host:port)"
    )]
    pub listen: std::net::SocketAddr,

    #[arg(
        long = "request-timeout-ms",
        env = "CATANDDOG_REQUEST_TIMEOUT_MS",
        default_value_t = 4000u64,
        value_name = "MS",
        help = "Total time budget of one request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "max-body-bytes",
        env = "CATANDDOG_MAX_BODY_BYTES",
        default_value_t = 1usize << 20,
        value_name = "BYTES",
        help = "Reject request bodies larger than BYTES"
    )]
    pub max_body_bytes: usize,

    #[arg(
        long = "update-concurrency",
        env = "CATANDDOG_UPDATE_CONCURRENCY",
        default_value_t = 8usize,
        value_name = "N",
        help = "Run at most N per-identifier updates at once"
    )]
    pub update_concurrency: usize,

    #[arg(
        long = "log-format",
        env = "CATANDDOG_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        help = "Log line format"
    )]
    pub log_format: LogFormat,

    #[arg(
        long = "log-file",
        env = "CATANDDOG_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    println!("Loaded env from {}", dotenv_path);
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["catanddog", "--db-uri", "registry.sqlite3"]).unwrap();
        assert_eq!(cli.db_uri, "registry.sqlite3");
        assert_eq!(cli.db_timeout_ms, 1000);
        assert_eq!(cli.request_timeout_ms, 4000);
        assert_eq!(cli.update_concurrency, 8);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.init_db);
        assert!(cli.cmd.is_none());
    }

    #[test]
    fn init_db_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "catanddog",
            "--db-uri",
            "registry.sqlite3",
            "--log-format",
            "json",
            "init-db",
            "--seed",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.cmd, Some(Command::InitDb { seed: true })));
    }
}
