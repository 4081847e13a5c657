//! Wearable CLI - command-line interface for wearable-metrics
//!
//! Commands:
//! - overview: Load a trailing window and print derived metrics
//! - records: Dump raw records of one type for a date range
//! - status: Report (and optionally open) the adapter connection
//! - doctor: Diagnose configuration and data source health
//! - config: Print or initialize the configuration file

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use wearable_metrics::config::{AdapterKind, Config};
use wearable_metrics::{
    logging, OverviewLoader, TimeRange, WearableError, WearableProvider, PRODUCER_NAME, VERSION,
};

/// Wearable - derived recovery metrics from wearable data
#[derive(Parser)]
#[command(name = "wearable")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Query wearable data sources and compute trend metrics", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Override the configured data source
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Garmin Connect export file (implies --source garmin-export)
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a trailing window and print derived metrics
    Overview {
        #[command(flatten)]
        source: SourceArgs,

        /// Last day of the window (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        end: Option<String>,

        /// Window length in days (defaults to config)
        #[arg(long)]
        days: Option<u32>,

        /// Output format (pretty on a terminal, ndjson otherwise)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Dump raw records of one type
    Records {
        /// Record type to dump
        #[arg(value_enum)]
        kind: RecordKind,

        #[command(flatten)]
        source: SourceArgs,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day (YYYY-MM-DD, defaults to --start)
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Report the adapter connection status
    Status {
        #[command(flatten)]
        source: SourceArgs,

        /// Open the adapter session first, if it has one
        #[arg(long)]
        connect: bool,
    },

    /// Diagnose configuration and data source health
    Doctor {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write the effective configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Mock,
    GarminExport,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Sleep,
    Hrv,
    Activity,
    Energy,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliErrorReport::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    let config = load_config(&config_path)?;

    logging::init_with_level(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match cli.command {
        Commands::Overview {
            source,
            end,
            days,
            format,
        } => cmd_overview(&config, &source, end.as_deref(), days, format).await,

        Commands::Records {
            kind,
            source,
            start,
            end,
            format,
        } => cmd_records(&config, &source, kind, &start, end.as_deref(), format).await,

        Commands::Status { source, connect } => cmd_status(&config, &source, connect).await,

        Commands::Doctor { source, json } => cmd_doctor(&config, &config_path, &source, json).await,

        Commands::Config { init } => cmd_config(&config, &config_path, init),
    }
}

fn load_config(path: &Path) -> Result<Config, CliError> {
    if path.exists() {
        Ok(Config::load_from(path)?)
    } else {
        Ok(Config::default())
    }
}

/// Apply command-line source overrides on top of the file configuration
fn effective_config(config: &Config, args: &SourceArgs) -> Config {
    let mut config = config.clone();
    if let Some(path) = &args.export {
        config.wearable.source = AdapterKind::GarminExport;
        config.wearable.export_path = Some(path.clone());
    }
    match args.source {
        Some(SourceArg::Mock) => config.wearable.source = AdapterKind::Mock,
        Some(SourceArg::GarminExport) => config.wearable.source = AdapterKind::GarminExport,
        None => {}
    }
    config
}

/// Build the configured adapter, install it and open its session
async fn connected_provider(config: &Config) -> Result<WearableProvider, CliError> {
    let provider = WearableProvider::initialize(config.build_adapter()?).await;
    provider.connect().await?;
    Ok(provider)
}

async fn cmd_overview(
    config: &Config,
    args: &SourceArgs,
    end: Option<&str>,
    days: Option<u32>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let mut config = effective_config(config, args);
    if let Some(days) = days {
        config.wearable.window_days = days;
        config.validate()?;
    }
    let last_day = match end {
        Some(raw) => parse_day(raw)?,
        None => Utc::now().date_naive(),
    };

    let provider = connected_provider(&config).await?;
    let loader = OverviewLoader::with_window(provider, config.wearable.window_days);

    let report = loader.fetch(last_day, &ctrl_c_token()).await?;
    print!("{}", format_output(&[report], resolve_format(format))?);
    Ok(())
}

async fn cmd_records(
    config: &Config,
    args: &SourceArgs,
    kind: RecordKind,
    start: &str,
    end: Option<&str>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let config = effective_config(config, args);
    let first = parse_day(start)?;
    let last = match end {
        Some(raw) => parse_day(raw)?,
        None => first,
    };
    let range = TimeRange::from_days(first, last)?;

    let provider = connected_provider(&config).await?;
    let adapter = provider.adapter();
    let format = resolve_format(format);

    let output = match kind {
        RecordKind::Sleep => format_output(&adapter.sleep(&range).await?, format)?,
        RecordKind::Hrv => format_output(&adapter.hrv(&range).await?, format)?,
        RecordKind::Activity => format_output(&adapter.daily_activity(&range).await?, format)?,
        RecordKind::Energy => format_output(&adapter.energy_signal(&range).await?, format)?,
    };

    print!("{}", output);
    Ok(())
}

async fn cmd_status(config: &Config, args: &SourceArgs, connect: bool) -> Result<(), CliError> {
    let config = effective_config(config, args);
    let provider = WearableProvider::initialize(config.build_adapter()?).await;

    if connect {
        // a failed connect is reflected in the printed status
        if let Err(e) = provider.connect().await {
            tracing::warn!(error = %e, "connect failed");
        }
    }

    let status = provider.status();
    println!("{}", serde_json::to_string(&status)?);
    Ok(())
}

async fn cmd_doctor(
    config: &Config,
    config_path: &Path,
    args: &SourceArgs,
    json: bool,
) -> Result<(), CliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    checks.push(if config_path.exists() {
        DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!("Loaded {}", config_path.display()),
        }
    } else {
        DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} not found, using defaults", config_path.display()),
        }
    });

    let config = effective_config(config, args);
    match config.build_adapter() {
        Ok(adapter) => {
            checks.push(DoctorCheck {
                name: "adapter".to_string(),
                status: CheckStatus::Ok,
                message: format!("Built {} adapter", adapter.source()),
            });

            let provider = WearableProvider::initialize(adapter).await;
            let connected = provider.connect().await;
            let status = provider.status();
            checks.push(DoctorCheck {
                name: "status".to_string(),
                status: match (&connected, status.is_connected()) {
                    (Ok(()), true) => CheckStatus::Ok,
                    (Ok(()), false) => CheckStatus::Warning,
                    (Err(_), _) => CheckStatus::Error,
                },
                message: status.label(),
            });
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "adapter".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Wearable Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_config(config: &Config, config_path: &Path, init: bool) -> Result<(), CliError> {
    if init {
        config.save_to(config_path)?;
        println!("Wrote {}", config_path.display());
    } else {
        let rendered =
            toml::to_string_pretty(config).map_err(|e| CliError::Render(e.to_string()))?;
        print!("{}", rendered);
    }
    Ok(())
}

// Helper functions

/// Token cancelled on Ctrl-C so in-flight queries are dropped
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn parse_day(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| CliError::InvalidDate(raw.to_string()))
}

fn resolve_format(format: Option<OutputFormat>) -> OutputFormat {
    format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Ndjson
        }
    })
}

fn format_output<T: Serialize>(items: &[T], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Wearable(WearableError),
    Json(serde_json::Error),
    InvalidDate(String),
    Render(String),
    DoctorFailed,
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<WearableError> for CliError {
    fn from(e: WearableError) -> Self {
        CliError::Wearable(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliErrorReport {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliError> for CliErrorReport {
    fn from(e: CliError) -> Self {
        match e {
            CliError::Io(e) => CliErrorReport {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliError::Wearable(WearableError::Cancelled) => CliErrorReport {
                code: "CANCELLED".to_string(),
                message: "Interrupted before the data finished loading".to_string(),
                hint: None,
            },
            CliError::Wearable(e @ (WearableError::Config(_) | WearableError::Toml(_))) => {
                CliErrorReport {
                    code: "CONFIG_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("Run 'wearable config' to inspect the configuration".to_string()),
                }
            }
            CliError::Wearable(e) => CliErrorReport {
                code: "WEARABLE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'wearable doctor' for details".to_string()),
            },
            CliError::Json(e) => CliErrorReport {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliError::InvalidDate(raw) => CliErrorReport {
                code: "INVALID_DATE".to_string(),
                message: format!("Invalid date {:?}", raw),
                hint: Some("Use YYYY-MM-DD".to_string()),
            },
            CliError::Render(msg) => CliErrorReport {
                code: "RENDER_ERROR".to_string(),
                message: msg,
                hint: None,
            },
            CliError::DoctorFailed => CliErrorReport {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
