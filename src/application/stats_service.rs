// Stats service - Housekeeping threshold statistics per station
use crate::application::telemetry_repository::{FieldQuery, TelemetryRepository};
use crate::domain::statistics::{exceedance_percentage, MonthWindow, StatsReport};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct StatsService {
    repository: Arc<dyn TelemetryRepository>,
}

impl StatsService {
    pub fn new(repository: Arc<dyn TelemetryRepository>) -> Self {
        Self { repository }
    }

    /// Percentage of hourly means above each field's threshold, per station
    /// and instrument pid. A field that cannot be queried is logged and left
    /// out of its station; other fields and stations are still computed.
    pub async fn compute(
        &self,
        instrument_type: &str,
        thresholds: &[(String, f64)],
        window: MonthWindow,
    ) -> Result<StatsReport> {
        tracing::info!("Getting CCRES stations...");
        let stations = self.repository.list_station_ids().await?;
        tracing::info!("{} CCRES stations: {}", stations.len(), stations.join(", "));

        let mut report = StatsReport::new();
        if stations.is_empty() {
            tracing::warn!("No data found for the given period.");
            return Ok(report);
        }

        for station in &stations {
            tracing::info!("station {}", station);
            let mut fields = BTreeMap::new();

            for (field, threshold) in thresholds {
                tracing::info!("hkd {}", field);
                let query = FieldQuery {
                    station,
                    instrument_type,
                    field,
                    window,
                };

                let series = match self.repository.hourly_means(query).await {
                    Ok(series) => series,
                    Err(e) => {
                        tracing::error!("Cannot query {} for {}: {}", field, station, e);
                        continue;
                    }
                };

                let mut by_pid = BTreeMap::new();
                for pid_series in series {
                    let percentage = exceedance_percentage(&pid_series.points, *threshold);
                    tracing::info!(
                        "instrument_pid {}: {} hourly samples, {:?}% above {}",
                        pid_series.instrument_pid,
                        pid_series.points.len(),
                        percentage,
                        threshold
                    );
                    by_pid.insert(pid_series.instrument_pid, percentage);
                }
                fields.insert(field.clone(), by_pid);
            }

            report.insert(station.clone(), fields);
        }

        Ok(report)
    }
}
