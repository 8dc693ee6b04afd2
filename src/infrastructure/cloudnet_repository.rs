// Cloudnet data-portal catalog adapter
use crate::application::catalog_repository::CatalogRepository;
use crate::domain::instrument::{dedup_instruments, Instrument, Station};
use crate::error::{CcresError, Result};
use crate::infrastructure::config::HttpSettings;
use crate::infrastructure::http;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct CloudnetRepository {
    client: Client,
    base_url: String,
    http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    instrument: Option<RawFileInstrument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileInstrument {
    instrument_id: String,
    pid: String,
    name: String,
}

impl CloudnetRepository {
    pub fn new(client: Client, base_url: &str, http: HttpSettings) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url_sites(&self) -> String {
        format!("{}/sites", self.base_url)
    }

    fn url_raw_files(&self) -> String {
        format!("{}/raw-files", self.base_url)
    }
}

#[async_trait]
impl CatalogRepository for CloudnetRepository {
    async fn list_actris_stations(&self) -> Result<Vec<Station>> {
        let url = self.url_sites();
        let context = "listing Cloudnet sites";

        let response = http::send(|| self.client.get(&url), &self.http, context).await?;
        let sites: Vec<Station> = http::json(response, context).await?;

        let stations: Vec<Station> = sites.into_iter().filter(Station::is_actris).collect();
        tracing::debug!("{} ACTRIS stations in catalog", stations.len());
        Ok(stations)
    }

    async fn get_station_instruments(&self, station: &str, date_from: NaiveDate) -> Result<Vec<Instrument>> {
        if station.is_empty() {
            return Err(CcresError::config("empty station identifier"));
        }

        let url = self.url_raw_files();
        let date = date_from.format(DATE_FMT).to_string();
        let context = format!("listing instruments of {station} since {date}");

        let response = http::send(
            || {
                self.client
                    .get(&url)
                    .query(&[("site", station), ("dateFrom", date.as_str())])
                    .timeout(self.http.instruments_timeout())
            },
            &self.http,
            &context,
        )
        .await?;
        let files: Vec<RawFile> = http::json(response, &context).await?;
        let total = files.len();

        let instruments = dedup_instruments(
            files
                .into_iter()
                .filter_map(|file| file.instrument)
                .map(|i| Instrument::new(i.instrument_id, i.pid, i.name)),
        );

        tracing::debug!(
            "{} raw files for {} since {}, {} distinct instruments",
            total,
            station,
            date,
            instruments.len()
        );
        Ok(instruments)
    }
}
