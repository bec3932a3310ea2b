//! Command-line entrypoint for restoring a backup stream into a cbfs store.

use std::path::PathBuf;
use std::sync::Arc;

use cbfs_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, run_span};
use clap::Parser;
use reqwest::Url;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{RestoreClient, build_http_client};
use crate::config::{
    DEFAULT_MATCH, DEFAULT_STORE_URL, DEFAULT_WORKERS, NO_EXPIRE_OVERRIDE, RestoreConfig,
};
use crate::error::RestoreError;
use crate::pipeline::{RestoreSummary, run_restore};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<RestoreError> for CliError {
    fn from(err: RestoreError) -> Self {
        if err.is_validation() {
            Self::Validation(format!("{:#}", anyhow::Error::from(err)))
        } else {
            Self::Failure(err.into())
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cbfs-restore",
    about = "Restore files into a cbfs store from a compressed backup stream"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "CBFS_URL",
        value_parser = parse_url,
        default_value = DEFAULT_STORE_URL,
        help = "Base URL of the target store"
    )]
    url: Url,
    #[arg(short = 'f', long, help = "Overwrite existing files")]
    force: bool,
    #[arg(short = 'n', long, help = "Log what would be restored without calling the store")]
    noop: bool,
    #[arg(short = 'v', long, help = "Log every file handed to a worker")]
    verbose: bool,
    #[arg(long = "match", default_value = DEFAULT_MATCH, help = "Regex for paths to match")]
    pattern: String,
    #[arg(
        long,
        env = "CBFS_RESTORE_WORKERS",
        default_value_t = DEFAULT_WORKERS,
        help = "Number of restore workers"
    )]
    workers: usize,
    #[arg(
        long,
        default_value_t = NO_EXPIRE_OVERRIDE,
        allow_negative_numbers = true,
        help = "Override expiration time (in seconds, or absolute unix time)"
    )]
    expire: i64,
    #[arg(long, env = "CBFS_LOG_FORMAT", help = "Log output format: pretty or json")]
    log_format: Option<LogFormat>,
    #[arg(long, env = "CBFS_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(help = "Path to the compressed backup file")]
    file: PathBuf,
}

impl Cli {
    fn into_config(self) -> RestoreConfig {
        RestoreConfig {
            base_url: self.url,
            source: self.file,
            pattern: self.pattern,
            force: self.force,
            noop: self.noop,
            verbose: self.verbose,
            workers: self.workers,
            expire: self.expire,
        }
    }
}

/// Parses CLI arguments, performs the restore, and reports the outcome.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let run_id = Uuid::new_v4().to_string();
    let result = execute(cli, &run_id)
        .instrument(run_span("restore", &run_id))
        .await;

    match result {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli, run_id: &str) -> CliResult<RestoreSummary> {
    let config = Arc::new(cli.into_config());
    let client = RestoreClient::new(build_http_client(run_id)?, &config);
    Ok(run_restore(config, client).await?)
}

/// Parse the store URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
