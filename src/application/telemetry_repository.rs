// Repository trait for housekeeping telemetry access
use crate::domain::statistics::{MonthWindow, TimeSeriesPoint};
use crate::error::Result;
use async_trait::async_trait;

/// Hourly means of one field for one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct PidSeries {
    pub instrument_pid: String,
    pub points: Vec<TimeSeriesPoint>,
}

/// One housekeeping field of one instrument type at one station
#[derive(Debug, Clone, Copy)]
pub struct FieldQuery<'a> {
    pub station: &'a str,
    pub instrument_type: &'a str,
    pub field: &'a str,
    pub window: MonthWindow,
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// List all station ids present in the housekeeping measurement
    async fn list_station_ids(&self) -> Result<Vec<String>>;

    /// Hourly means of a field within the window, one series per instrument pid
    async fn hourly_means(&self, query: FieldQuery<'_>) -> Result<Vec<PidSeries>>;
}
