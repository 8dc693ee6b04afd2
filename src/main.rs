// Main entry point
use ccres_grafana::presentation::cli::{Cli, Command};
use ccres_grafana::presentation::{commands, logging};
use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let now = Utc::now();
    let outcome = match &cli.command {
        Command::CreateDashboards { config_file, stations } => {
            commands::run_create_dashboards(config_file, stations, now).await
        }
        Command::Stats {
            config_file,
            output_json,
            instrument,
            month,
        } => commands::run_stats(config_file, output_json, instrument, month.as_deref(), now).await,
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
