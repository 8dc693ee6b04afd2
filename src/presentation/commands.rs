// Command runners - Dependency injection for each subcommand
use crate::application::dashboard_service::{DashboardService, DashboardSettings};
use crate::application::instruments_service::InstrumentsService;
use crate::application::stats_service::StatsService;
use crate::domain::statistics::MonthWindow;
use crate::error::CcresError;
use crate::infrastructure::cache_store::CacheStore;
use crate::infrastructure::cloudnet_repository::CloudnetRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::grafana_repository::GrafanaRepository;
use crate::infrastructure::http;
use crate::infrastructure::influx_repository::InfluxRepository;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Provision dashboards; fails the process when any station failed
pub async fn run_create_dashboards(
    config_file: &Path,
    stations: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(config_file)?;
    let grafana = config.grafana()?;

    // Create repositories (infrastructure layer)
    let client = http::build_client(&config.http)?;
    let catalog = Arc::new(CloudnetRepository::new(
        client.clone(),
        &config.cloudnet.url,
        config.http.clone(),
    ));
    let dashboards = Arc::new(GrafanaRepository::new(
        client,
        &grafana.url,
        grafana.token.clone(),
        config.http.clone(),
    ));
    let store = CacheStore::new(config.cache_dir());
    tracing::debug!("Instrument cache directory: {}", store.dir().display());

    // Create services (application layer)
    let instruments = InstrumentsService::new(catalog.clone(), store);
    let settings = DashboardSettings {
        templates: config.dashboard_templates(),
        influx_ql_uid: grafana.influx_ql_uid.clone(),
    };
    let mut service = DashboardService::new(catalog, instruments, dashboards, settings);

    let report = service.create_dashboards(stations, now).await?;
    tracing::info!(
        "{} dashboards uploaded for {} stations",
        report.dashboards.len(),
        report.stations
    );

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }
    for (station, reason) in &report.failures {
        tracing::error!("{}: {}", station, reason);
    }
    Ok(ExitCode::FAILURE)
}

/// Compute threshold statistics for one month and write them as JSON
pub async fn run_stats(
    config_file: &Path,
    output_json: &Path,
    instrument_type: &str,
    month: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(config_file)?;
    let influx = config.influxdb()?;
    let thresholds = config.hkds(instrument_type)?.thresholds(instrument_type)?;

    let window = match month {
        Some(raw) => MonthWindow::parse_month(raw)
            .ok_or_else(|| CcresError::config(format!("invalid month {raw}, expected YYYY-MM")))?,
        None => MonthWindow::previous_month(now),
    };
    tracing::info!(
        "Statistics of {} from {} to {}",
        instrument_type,
        window.start_rfc3339(),
        window.end_rfc3339()
    );

    let client = http::build_client(&config.http)?;
    let repository = Arc::new(InfluxRepository::new(
        client,
        &influx.host(),
        influx.token.clone(),
        influx.bucket.clone(),
        config.http.clone(),
    ));
    tracing::debug!("InfluxDB organisation: {}", influx.org);

    let report = StatsService::new(repository)
        .compute(instrument_type, &thresholds, window)
        .await?;

    let json = serde_json::to_string_pretty(&report)?;
    tokio::fs::write(output_json, json)
        .await
        .with_context(|| format!("writing {}", output_json.display()))?;
    tracing::info!("Statistics written to {}", output_json.display());

    Ok(ExitCode::SUCCESS)
}
