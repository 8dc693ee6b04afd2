// Command line arguments
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Provision Grafana housekeeping dashboards for ACTRIS-CCRES stations and
/// compute monthly housekeeping statistics.
#[derive(Debug, Parser)]
#[command(name = "ccres-grafana", version, about)]
pub struct Cli {
    /// Log verbosity
    #[arg(short, long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub verbose: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update one dashboard per station and instrument
    CreateDashboards {
        /// TOML configuration file
        config_file: PathBuf,

        /// Only process this station (repeatable)
        #[arg(short, long = "station")]
        stations: Vec<String>,
    },

    /// Percentage of hourly housekeeping means above their thresholds
    Stats {
        /// TOML configuration file
        config_file: PathBuf,

        /// Where to write the JSON report
        output_json: PathBuf,

        /// Instrument type whose housekeeping fields are analysed
        #[arg(short, long, default_value = "chm15k")]
        instrument: String,

        /// Month to analyse as YYYY-MM, the previous calendar month by default
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "CRITICAL")]
    Critical,
}

impl LogLevel {
    /// Matching `tracing` level; there is nothing above error
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}
