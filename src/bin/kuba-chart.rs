//! Kuba Chart CLI
//!
//! Runs the aggregation engine over a JSON `ChartRequest` read from a file or
//! stdin and prints the JSON `ChartResult`.
//!
//! # CLI Commands
//!
//! - `aggregate` - Aggregate a request (default input: stdin)
//! - `check-config` - Validate configuration file
//! - `metrics` - Aggregate a request and print Prometheus metrics
//!
//! # Configuration
//!
//! The CLI reads configuration from:
//! 1. `--config <path>`
//! 2. `CHART_CONFIG` environment variable (path to TOML file)
//! 3. Default configuration
//!
//! Environment overrides are applied on top in every case.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kuba_chart::config::ChartConfig;
use kuba_chart::{ChartEngine, ChartRequest, ChartResult, Error, FixedClock, Result};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "kuba-chart")]
#[command(version)]
#[command(about = "Aggregate timestamped records into chart-ready time buckets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides CHART_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a JSON chart request
    Aggregate {
        /// Request file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,

        /// Pin "today" (YYYY-MM-DD) for reproducible relative periods
        #[arg(long)]
        now: Option<NaiveDate>,
    },

    /// Validate configuration file and print the effective configuration
    CheckConfig,

    /// Aggregate a request, then print Prometheus metrics instead of the result
    Metrics {
        /// Request file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ChartConfig> {
    let path = path
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| std::env::var("CHART_CONFIG").ok());

    match path {
        Some(path) => ChartConfig::from_file_with_env(&path),
        None => Ok(ChartConfig::from_env()),
    }
}

fn read_request(input: &str) -> Result<ChartRequest> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn build_engine(config: ChartConfig, now: Option<NaiveDate>) -> Result<ChartEngine> {
    let builder = ChartEngine::builder().with_config(config);
    match now {
        Some(date) => builder.with_clock(FixedClock::at_date(date)).build(),
        None => builder.build(),
    }
}

fn render(result: &ChartResult, pretty: bool) -> Result<String> {
    if pretty {
        result.to_json_pretty()
    } else {
        result.to_json()
    }
}

fn run(cli: Cli, config: ChartConfig) -> Result<()> {
    match cli.command {
        Commands::Aggregate { input, pretty, now } => {
            let pretty = pretty || config.output.pretty;
            let engine = build_engine(config, now)?;
            let request = read_request(&input)?;
            let result = engine.aggregate(&request)?;
            if let Some(message) = result.diagnostic_message() {
                info!("{}", message);
            }
            println!("{}", render(&result, pretty)?);
        }
        Commands::CheckConfig => {
            config.validate()?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| Error::Serialization(e.to_string()))?;
            println!("{}", rendered);
            info!("Configuration is valid");
        }
        Commands::Metrics { input } => {
            let engine = build_engine(config, None)?;
            let request = read_request(&input)?;
            engine.aggregate(&request)?;
            let text = kuba_chart::metrics::gather_metrics().map_err(Error::General)?;
            print!("{}", text);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    debug!(
        sample_limit = config.engine.sample_limit,
        max_buckets = config.engine.max_buckets,
        "Configuration loaded"
    );

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
