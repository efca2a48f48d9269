//! Command-line surface shared by the `orm-demo` and `builder-demo` binaries.

mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::Level;

pub use logging::{RunLog, RunLogLine};

use crate::config::{DbConfig, PoolSettings};
#[cfg(feature = "postgres")]
use crate::config::PostgresOptions;
use crate::demo::RunOptions;
use crate::naming::NamingConvention;
use crate::types::DatabaseType;

/// Connection used when no `PostgreSQL` setting is given.
#[cfg(feature = "postgres")]
pub const DEFAULT_PG_DSN: &str = "dbname=rel sslmode=disable";

#[derive(Parser, Debug)]
#[command(author, version, about = "Product catalog walkthrough over PostgreSQL or SQLite")]
pub struct Args {
    /// Store to connect to (`postgres` when compiled in, otherwise `sqlite`).
    #[arg(long, value_enum, env = "REL_BACKEND")]
    pub backend: Option<DatabaseType>,
    /// libpq-style connection string or `postgresql://` URL.
    #[arg(long, env = "REL_DSN")]
    pub dsn: Option<String>,
    #[arg(long, env = "REL_HOST")]
    pub host: Option<String>,
    #[arg(long, env = "REL_PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "REL_DBNAME")]
    pub dbname: Option<String>,
    #[arg(long, env = "REL_USER")]
    pub user: Option<String>,
    #[arg(long, env = "REL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Database file for the `sqlite` backend.
    #[arg(long, env = "REL_SQLITE_PATH", default_value = "rel.db")]
    pub sqlite_path: String,
    #[arg(long, default_value_t = 4)]
    pub max_open: u32,
    #[arg(long)]
    pub min_idle: Option<u32>,
    /// Maximum connection age, e.g. `30m`; `0s` disables the limit.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30m")]
    pub max_lifetime: Duration,
    #[arg(long, value_enum, default_value = "snake")]
    pub naming: NamingConvention,
    /// Create missing tables before running.
    #[arg(long)]
    pub create_schema: bool,
    /// Log every generated statement.
    #[arg(long)]
    pub trace_sql: bool,
    /// Also write the log to this file.
    #[arg(long)]
    pub log: Option<PathBuf>,
    #[arg(long, short)]
    pub verbose: bool,
}

/// Resolved settings of one program run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoConfig {
    pub db: DbConfig,
    pub run: RunOptions,
    pub log: Option<PathBuf>,
    pub verbose: bool,
}

impl DemoConfig {
    #[must_use]
    pub fn from_args(args: Args) -> Self {
        let pool = PoolSettings::default()
            .max_open(args.max_open)
            .min_idle(args.min_idle)
            .max_lifetime(Some(args.max_lifetime).filter(|d| !d.is_zero()));

        let db = match args.backend.unwrap_or_else(default_backend) {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => DbConfig::postgres(postgres_options(&args)),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => DbConfig::sqlite(args.sqlite_path.clone()),
        }
        .with_pool(pool)
        .with_naming(args.naming);

        DemoConfig {
            db,
            run: RunOptions {
                create_schema: args.create_schema,
                trace_sql: args.trace_sql,
            },
            log: args.log,
            verbose: args.verbose,
        }
    }

    /// Most verbose level that reaches the log.
    #[must_use]
    pub fn max_level(&self) -> Level {
        if self.verbose || self.run.trace_sql {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Install the global subscriber: stdout plus, with `--log`, the run log.
    ///
    /// # Errors
    /// Returns the I/O error if the run log cannot be opened.
    pub fn init_logging(&self, program: &str) -> std::io::Result<()> {
        let writer = self.run_log(program)?;
        tracing_subscriber::fmt()
            .with_writer(writer)
            .with_target(false)
            .with_max_level(self.max_level())
            .init();
        Ok(())
    }

    /// Sink for `program`'s output. Runs appended to the same file are headed by the
    /// program, the store and the start time.
    ///
    /// # Errors
    /// Returns the I/O error if the run log cannot be opened.
    pub fn run_log(&self, program: &str) -> std::io::Result<RunLog> {
        let Some(path) = &self.log else {
            return Ok(RunLog::stdout());
        };
        let backend = match self.db.target.database_type() {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => "postgres",
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => "sqlite",
        };
        let started = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        RunLog::append(path, &format!("{program} {backend} {started}"))
    }

    /// Log the effective configuration as JSON. Passwords are never serialized.
    pub fn log_config(&self) {
        let config_json = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        tracing::info!("config: {}", config_json);
    }
}

fn default_backend() -> DatabaseType {
    #[cfg(feature = "postgres")]
    {
        DatabaseType::Postgres
    }
    #[cfg(not(feature = "postgres"))]
    {
        DatabaseType::Sqlite
    }
}

#[cfg(feature = "postgres")]
fn postgres_options(args: &Args) -> PostgresOptions {
    let structured = args.host.is_some()
        || args.port.is_some()
        || args.dbname.is_some()
        || args.user.is_some();
    let mut options = match (&args.dsn, structured) {
        (Some(dsn), _) => PostgresOptions::from_dsn(dsn.clone()),
        (None, false) => PostgresOptions::from_dsn(DEFAULT_PG_DSN),
        (None, true) => PostgresOptions::default(),
    };
    options.host.clone_from(&args.host);
    options.port = args.port;
    options.dbname.clone_from(&args.dbname);
    options.user.clone_from(&args.user);
    options.password.clone_from(&args.password);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionTarget;

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_flags_become_db_config() {
        let args = Args::parse_from([
            "builder-demo",
            "--backend",
            "sqlite",
            "--sqlite-path",
            "/tmp/catalog.db",
            "--max-open",
            "2",
            "--max-lifetime",
            "0s",
            "--naming",
            "camel",
            "--trace-sql",
        ]);
        let config = DemoConfig::from_args(args);
        assert!(matches!(
            config.db.target,
            ConnectionTarget::Sqlite(ref o) if o.db_path == "/tmp/catalog.db"
        ));
        assert_eq!(config.db.pool.max_open, 2);
        assert_eq!(config.db.pool.max_lifetime, None);
        assert_eq!(config.db.naming, NamingConvention::Camel);
        assert!(config.run.trace_sql);
        assert_eq!(config.max_level(), Level::DEBUG);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn run_log_header_names_program_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.log");
        let config = DemoConfig::from_args(Args::parse_from([
            "orm-demo",
            "--backend",
            "sqlite",
            "--log",
            path.to_str().unwrap(),
        ]));
        drop(config.run_log("orm-demo").unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("=== orm-demo sqlite "), "{written}");
        assert!(written.ends_with(" ===\n"), "{written}");
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_defaults_to_local_rel_database() {
        let config = DemoConfig::from_args(Args::parse_from(["orm-demo", "--backend", "postgres"]));
        let ConnectionTarget::Postgres(options) = &config.db.target else {
            panic!("expected a postgres target");
        };
        assert_eq!(options.dsn.as_deref(), Some(DEFAULT_PG_DSN));
        assert_eq!(config.max_level(), Level::INFO);
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn config_json_hides_password() {
        let config = DemoConfig::from_args(Args::parse_from([
            "orm-demo",
            "--backend",
            "postgres",
            "--dbname",
            "rel",
            "--password",
            "hunter2",
        ]));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"dbname\":\"rel\""));
        assert!(!json.contains("hunter2"));
    }
}
