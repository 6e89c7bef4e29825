//! Settings of the `famledger` service.
//!
//! Sources, lowest precedence first: the TOML file (`config/famledger.toml`
//! unless `--config` points elsewhere), `FAMLEDGER__*` environment variables
//! and finally command line flags.

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/famledger.toml";
const DEFAULT_DATABASE: &str = "sqlite:./famledger.db?mode=rwc";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    Memory,
    Url(String),
}

impl Database {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "memory" | "sqlite::memory:" => Self::Memory,
            other => Self::Url(other.to_string()),
        }
    }

    pub fn url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::Url(url) if url.starts_with("sqlite:") => url.clone(),
            Self::Url(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Raw {
    app: App,
    server: Server,
    database: String,
}

impl Default for Raw {
    fn default() -> Self {
        Self {
            app: App::default(),
            server: Server::default(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
}

#[derive(Debug, Parser)]
#[command(name = "famledger", about = "Family budget allocation and payment attribution service")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the bind address.
    #[arg(long)]
    bind: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
    /// Override the database: `memory` or a sqlite URL/path.
    #[arg(long)]
    database_url: Option<String>,
    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self, ConfigError> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let raw: Raw = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("FAMLEDGER").separator("__"))
            .build()?
            .try_deserialize()?;

        let mut settings = Settings {
            app: raw.app,
            server: raw.server,
            database: Database::parse(&raw.database),
        };
        if let Some(bind) = args.bind {
            settings.server.bind = bind;
        }
        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if let Some(database) = args.database_url {
            settings.database = Database::parse(&database);
        }
        if let Some(level) = args.log_level {
            settings.app.level = level;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_urls() {
        assert_eq!(Database::parse("memory").url(), "sqlite::memory:");
        assert_eq!(
            Database::parse("./data/ledger.db").url(),
            "sqlite:./data/ledger.db?mode=rwc"
        );
        assert_eq!(Database::parse(DEFAULT_DATABASE).url(), DEFAULT_DATABASE);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args::parse_from([
            "famledger",
            "--config",
            "does/not/exist.toml",
            "--port",
            "8080",
            "--database-url",
            "memory",
            "--log-level",
            "debug",
        ]);
        let settings = Settings::from_args(args).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.bind, "127.0.0.1");
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.app.level, "debug");
    }
}
