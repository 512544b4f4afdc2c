//! Library module for sqlscout-collect
//!
//! Command-line definitions and parameter resolution, exposed for testing.
//! The binary entry point is in main.rs.
//!
//! Settings are layered: command-line flag, then environment variable, then
//! a `.env` file in the working directory (loaded before parsing), then the
//! built-in default.

pub mod collect;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use sqlscout_core::adapters::config::parse_flag;
use sqlscout_core::report::DEFAULT_OUTPUT;
use sqlscout_core::security::Credentials;
use sqlscout_core::{
    AnalysisConfig, CardinalityMode, ConnectionParams, EncryptMode, LogFormat, ReportFormat,
    Result, ScoutError, SurveyOptions,
};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "sqlscout-collect")]
#[command(about = "SQL Server schema and relationship survey")]
#[command(version)]
#[command(long_about = r"
SQLScout Collector - SQL Server relationship survey

Connects to one SQL Server database and writes a report containing:
- Tables and columns from INFORMATION_SCHEMA
- Foreign keys from the sys.* catalog views
- Row counts from partition statistics
- Referenced-value distributions and cardinality per foreign key

SECURITY FEATURES:
- Read-only catalog and aggregate queries only
- No credentials stored or logged
- Password from DB_PASSWORD or an interactive prompt, never a flag

EXAMPLES:
  sqlscout-collect --server db01\SQLEXPRESS --database MovieReviews --username scout --password-prompt
  DATABASE_URL=mssql://scout:pw@db01:1433/MovieReviews sqlscout-collect -o report.json
  sqlscout-collect test --server localhost,1433 --database master
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute; a survey runs when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub collect: CollectArgs,
}

impl Cli {
    /// Parses the process arguments, exiting with a usage error on failure.
    pub fn parse_args() -> Self {
        Self::try_parse_args_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parses `argv`, rejecting survey flags placed before a subcommand.
    ///
    /// Top-level survey flags only drive the default run; next to a
    /// subcommand they would be silently dropped. Values from the
    /// environment are not affected.
    ///
    /// # Errors
    /// Returns the clap usage error.
    pub fn try_parse_args_from<I, T>(argv: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut cmd = Self::command();
        let matches = cmd.try_get_matches_from_mut(argv)?;

        if let Some((name, _)) = matches.subcommand() {
            let misplaced = CollectArgs::augment_args(clap::Command::new("collect"))
                .get_arguments()
                .find(|arg| {
                    matches.value_source(arg.get_id().as_str()) == Some(ValueSource::CommandLine)
                })
                .map(|arg| match arg.get_long() {
                    Some(long) => format!("--{}", long),
                    None => arg.get_id().to_string(),
                });
            if let Some(flag) = misplaced {
                return Err(cmd.error(
                    ErrorKind::ArgumentConflict,
                    format!("'{}' must follow the '{}' subcommand", flag, name),
                ));
            }
        }

        Self::from_arg_matches(&matches).map_err(|e| e.format(&mut cmd))
    }
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Survey the database and write the report
    Collect(CollectArgs),
    /// Test the database connection
    Test(ConnectionArgs),
    /// List accepted server notations and output formats
    List,
}

/// Logging flags shared by every command
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Log event format
    #[arg(
        long,
        global = true,
        default_value = "text",
        value_name = "FORMAT",
        help = "Log format: text or json"
    )]
    pub log_format: LogFormat,
}

/// Everything a survey run needs
#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Where and how to connect
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        help = "mssql:// or sqlserver:// URL; its query keys govern encryption (credentials are sanitized in logs)"
    )]
    pub database_url: Option<String>,

    /// Server address
    #[arg(
        long,
        env = "DB_SERVER",
        value_name = "SERVER",
        help = r"Server as host, host\instance or host,port"
    )]
    pub server: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME", value_name = "NAME")]
    pub database: Option<String>,

    /// TCP port
    #[arg(long, env = "DB_PORT", help = "TCP port (default 1433)")]
    pub port: Option<u16>,

    /// SQL login name
    #[arg(
        long,
        env = "DB_USER",
        help = "SQL login; omit for Windows integrated authentication"
    )]
    pub username: Option<String>,

    /// Prompt for the password
    #[arg(long, help = "Read the SQL login password from the terminal")]
    pub password_prompt: bool,

    /// TLS mode
    #[arg(
        long,
        env = "DB_ENCRYPT",
        default_value = "on",
        value_name = "MODE",
        help = "Encryption: off, on or required"
    )]
    pub encrypt: EncryptMode,

    /// Trust the server certificate
    #[arg(
        long,
        env = "DB_TRUST_CERT",
        default_value = "true",
        value_name = "BOOL",
        action = clap::ArgAction::Set,
        value_parser = parse_flag
    )]
    pub trust_server_certificate: bool,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 30, value_name = "SECONDS")]
    pub connect_timeout: u64,

    /// Pooled connections
    #[arg(long, default_value_t = 1, help = "Pooled connections (1-32)")]
    pub max_connections: u32,
}

/// Distribution analysis settings
#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    /// Referenced values kept per relationship
    #[arg(long, default_value_t = 50, help = "Referenced values kept per relationship (0 = all)")]
    pub top_n: u32,

    /// Drop values no parent row references
    #[arg(long, help = "Drop referenced values with no parent rows")]
    pub exclude_zeroes: bool,

    /// Cardinality basis
    #[arg(
        long,
        default_value = "distinct",
        value_name = "MODE",
        help = "Cardinality basis: distinct or table_size"
    )]
    pub cardinality_mode: CardinalityMode,

    /// Relationships analysed at once
    #[arg(long, default_value_t = 4, help = "Relationships analysed at once (1-32)")]
    pub concurrency: u32,

    /// Skip row count collection
    #[arg(long)]
    pub skip_row_counts: bool,

    /// Skip distribution analysis
    #[arg(long)]
    pub skip_distributions: bool,

    /// Free-text notes stored in the report
    #[arg(long)]
    pub notes: Option<String>,
}

/// Report destination
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output file path
    #[arg(
        short,
        long,
        default_value = DEFAULT_OUTPUT,
        help = "Output file path (.yaml, .yml or .json)"
    )]
    pub output: PathBuf,

    /// Output encoding
    #[arg(long, help = "Force yaml or json instead of inferring from the extension")]
    pub format: Option<ReportFormat>,
}

impl ConnectionArgs {
    /// Resolves the connection parameters, reading the password from
    /// `DB_PASSWORD` or the terminal.
    ///
    /// # Errors
    /// Returns a configuration error when no server is given, the password
    /// prompt fails, or the resulting parameters are invalid.
    ///
    /// # Security
    /// The password is never logged and only lives in zeroizing storage
    /// once handed to [`Credentials`].
    pub fn connection_params(&self) -> Result<ConnectionParams> {
        if let Ok(driver) = std::env::var("DB_DRIVER") {
            tracing::debug!("Ignoring DB_DRIVER '{}': the TDS client needs no ODBC driver", driver);
        }
        let password = self.read_password()?;
        self.build_params(password)
    }

    fn read_password(&self) -> Result<Option<String>> {
        if self.password_prompt {
            let password = rpassword::prompt_password("SQL Server password: ")
                .map_err(|e| ScoutError::configuration(format!("Failed to read password: {}", e)))?;
            return Ok(Some(password));
        }
        Ok(std::env::var("DB_PASSWORD").ok().filter(|p| !p.is_empty()))
    }

    /// Builds connection parameters with an already obtained password.
    ///
    /// A URL takes precedence over `--server`; `--database` and `--port`
    /// only fill in what the URL leaves out. A password embedded in the URL
    /// wins over `password`.
    ///
    /// # Errors
    /// Returns a configuration error for missing or invalid settings.
    pub fn build_params(&self, password: Option<String>) -> Result<ConnectionParams> {
        let mut params = match (&self.database_url, &self.server) {
            (Some(url), server) => {
                if server.is_some() {
                    tracing::warn!("Both a database URL and a server were given; using the URL");
                }
                ConnectionParams::from_url(url)?
            }
            (None, Some(server)) => ConnectionParams::from_server(server)?
                .with_encrypt(self.encrypt)
                .with_trust_server_certificate(self.trust_server_certificate),
            (None, None) => {
                return Err(ScoutError::configuration(
                    "Database connection information required. Set DATABASE_URL or DB_SERVER, or pass --database-url or --server.",
                ));
            }
        };

        if params.database.is_empty()
            && let Some(database) = &self.database
        {
            params = params.with_database(database.clone());
        }
        if params.port.is_none()
            && let Some(port) = self.port
        {
            params = params.with_port(port);
        }

        let username = params
            .credentials
            .as_ref()
            .map(|c| c.username().to_string())
            .or_else(|| self.username.clone());
        match username {
            Some(username) => {
                let password = params
                    .credentials
                    .as_ref()
                    .and_then(|c| c.password().map(str::to_string))
                    .or(password);
                params = params.with_credentials(Credentials::new(username, password));
            }
            None => tracing::debug!("No SQL login given; using integrated authentication"),
        }

        params = params
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_max_connections(self.max_connections);
        params.validate()?;
        Ok(params)
    }
}

impl AnalysisArgs {
    /// Builds validated survey options.
    ///
    /// # Errors
    /// Returns a configuration error for an out-of-range concurrency.
    pub fn survey_options(&self) -> Result<SurveyOptions> {
        let analysis = AnalysisConfig::new()
            .with_top_n(self.top_n)
            .with_include_zeroes(!self.exclude_zeroes)
            .with_cardinality_mode(self.cardinality_mode)
            .with_concurrency(self.concurrency);
        analysis.validate()?;

        Ok(SurveyOptions {
            analysis,
            collect_row_counts: !self.skip_row_counts,
            analyze_distributions: !self.skip_distributions,
            notes: self.notes.clone(),
        })
    }
}

impl OutputArgs {
    /// Output encoding: `--format`, else the file extension, else YAML.
    pub fn report_format(&self) -> ReportFormat {
        ReportFormat::resolve(&self.output, self.format)
    }
}
