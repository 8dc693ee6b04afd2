// Dashboard service - Use case for provisioning station dashboards
use crate::application::catalog_repository::CatalogRepository;
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::instruments_service::InstrumentsService;
use crate::domain::dashboard::{Dashboard, Replacements};
use crate::domain::instrument::{Instrument, Station};
use crate::error::{CcresError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Instrument type -> template file
    pub templates: BTreeMap<String, PathBuf>,
    /// Grafana uid of the InfluxQL datasource referenced by the templates
    pub influx_ql_uid: String,
}

/// Outcome of one provisioning run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProvisionReport {
    pub stations: usize,
    pub dashboards: Vec<String>,
    pub failures: Vec<(String, String)>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct DashboardService {
    catalog: Arc<dyn CatalogRepository>,
    instruments: InstrumentsService,
    dashboards: Arc<dyn DashboardRepository>,
    settings: DashboardSettings,
    folders: Option<HashMap<String, String>>,
}

impl DashboardService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        instruments: InstrumentsService,
        dashboards: Arc<dyn DashboardRepository>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            catalog,
            instruments,
            dashboards,
            settings,
            folders: None,
        }
    }

    /// Create or update the dashboards of every ACTRIS station, or only of
    /// `selected` when it is not empty. A failing station is recorded in the
    /// report and does not stop the others.
    pub async fn create_dashboards(&mut self, selected: &[String], now: DateTime<Utc>) -> Result<ProvisionReport> {
        tracing::debug!(
            "Instruments with dashboard templates: {}",
            self.settings
                .templates
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );

        tracing::info!("Getting CCRES stations...");
        let mut stations = self.catalog.list_actris_stations().await?;
        let mut unknown = Vec::new();
        if !selected.is_empty() {
            stations.retain(|station| selected.contains(&station.id));
            for wanted in selected {
                if !stations.iter().any(|station| &station.id == wanted) {
                    let e = CcresError::NotFound(format!("station {wanted} in catalog"));
                    tracing::error!("{}", e);
                    unknown.push((wanted.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "{} CCRES stations: {}",
            stations.len(),
            stations
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut report = ProvisionReport {
            stations: stations.len(),
            failures: unknown,
            ..ProvisionReport::default()
        };

        for station in &stations {
            tracing::info!("Processing station: {} ({})", station.id, station.display_name());
            match self.provision_station(station, now).await {
                Ok(uids) => report.dashboards.extend(uids),
                Err(e) => {
                    tracing::error!("Station {} failed: {}", station.id, e);
                    report.failures.push((station.id.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn provision_station(&mut self, station: &Station, now: DateTime<Utc>) -> Result<Vec<String>> {
        let list = self.instruments.open(&station.id, now).await?;
        if list.instruments().is_empty() {
            tracing::warn!("No instruments for {}. Skipping", station.id);
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Instruments of {} ({}, last update {}): {}",
            list.station(),
            if list.refreshed() { "refreshed" } else { "cached" },
            list.last_update(),
            list.instruments()
                .iter()
                .map(|i| i.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut uploaded = Vec::new();
        for instrument in list.instruments() {
            tracing::info!(
                "Processing instrument: {}, {}, {}",
                instrument.id,
                instrument.pid,
                instrument.name
            );

            let Some(template_path) = self.settings.templates.get(&instrument.id).cloned() else {
                tracing::info!("Dashboard template for {} does not exist", instrument.id);
                continue;
            };

            let dashboard = self.build_dashboard(&template_path, instrument, &station.id).await?;
            let folder_uid = self.ensure_folder(&station.id).await?;

            let uid = dashboard.uid().unwrap_or_default().to_string();
            tracing::info!("Uploading dashboard UID: {}", uid);
            self.dashboards.upload_dashboard(&dashboard, &folder_uid).await?;
            uploaded.push(uid);
        }

        Ok(uploaded)
    }

    async fn build_dashboard(&self, template_path: &Path, instrument: &Instrument, station: &str) -> Result<Dashboard> {
        let malformed_pid = || CcresError::template(template_path, format!("malformed pid {}", instrument.pid));
        let pid_short = instrument.short_pid().ok_or_else(malformed_pid)?;
        let dashboard_uid = instrument.dashboard_uid(station).ok_or_else(malformed_pid)?;

        tracing::debug!("Dashboard template: {}", template_path.display());
        let template = tokio::fs::read_to_string(template_path)
            .await
            .map_err(|e| CcresError::template(template_path, e.to_string()))?;

        let replacements = Replacements::for_instrument(
            instrument,
            station,
            &dashboard_uid,
            &pid_short,
            &self.settings.influx_ql_uid,
        );
        let dashboard = Dashboard::from_template(&template, &replacements)
            .map_err(|e| CcresError::template(template_path, e.to_string()))?;

        let unresolved = dashboard.unresolved_tokens();
        if !unresolved.is_empty() {
            tracing::warn!(
                "Unresolved tokens in {}: {}",
                template_path.display(),
                unresolved.join(", ")
            );
        }

        Ok(dashboard)
    }

    /// Uid of the folder named `title`, created when missing. Existing folders
    /// are listed once per run.
    pub async fn ensure_folder(&mut self, title: &str) -> Result<String> {
        if self.folders.is_none() {
            let existing = self.dashboards.list_folders().await?;
            tracing::debug!("{} folders in Grafana", existing.len());
            self.folders = Some(existing.into_iter().map(|f| (f.title, f.uid)).collect());
        }

        let folders = self.folders.get_or_insert_with(HashMap::new);
        if let Some(uid) = folders.get(title) {
            tracing::debug!("Folder {} already exists", title);
            return Ok(uid.clone());
        }

        tracing::info!("Creating folder for {} ...", title);
        let uid = self.dashboards.create_folder(title).await?;
        folders.insert(title.to_string(), uid.clone());
        Ok(uid)
    }
}
