// Repository trait for the station/instrument catalog
use crate::domain::instrument::{Instrument, Station};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Stations that carry an ACTRIS identifier
    async fn list_actris_stations(&self) -> Result<Vec<Station>>;

    /// Distinct instruments seen in the station's raw files since `date_from`
    async fn get_station_instruments(&self, station: &str, date_from: NaiveDate) -> Result<Vec<Instrument>>;
}
