// Instruments service - Cached instrument metadata per station
use crate::application::catalog_repository::CatalogRepository;
use crate::domain::instrument::Instrument;
use crate::domain::instrument_cache::{InstrumentCacheRecord, CCRES_HKD_OLDEST_DATA};
use crate::error::{CcresError, Result};
use crate::infrastructure::cache_store::CacheStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Instrument list of one station, refreshed from the catalog when stale
#[derive(Debug, Clone)]
pub struct InstrumentsList {
    record: InstrumentCacheRecord,
    refreshed: bool,
}

impl InstrumentsList {
    pub fn station(&self) -> &str {
        &self.record.station
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.record.instruments
    }

    pub fn last_update(&self) -> NaiveDate {
        self.record.last_update
    }

    /// Whether opening this list went to the catalog
    pub fn refreshed(&self) -> bool {
        self.refreshed
    }
}

#[derive(Clone)]
pub struct InstrumentsService {
    catalog: Arc<dyn CatalogRepository>,
    store: CacheStore,
}

impl InstrumentsService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, store: CacheStore) -> Self {
        Self { catalog, store }
    }

    /// Load the station's cache and bring it up to date.
    ///
    /// Never cached: full fetch since the network epoch. Stale: fetch since
    /// the recorded day and merge. Otherwise the cache is used as is. Any
    /// fetch is persisted before returning.
    pub async fn open(&self, station: &str, now: DateTime<Utc>) -> Result<InstrumentsList> {
        if station.is_empty() {
            return Err(CcresError::config("empty station identifier"));
        }

        let record = match self.store.load(station).await {
            None => {
                tracing::info!("No instrument cache for {}, fetching full history", station);
                let fetched = self
                    .catalog
                    .get_station_instruments(station, CCRES_HKD_OLDEST_DATA)
                    .await?;
                let record = InstrumentCacheRecord::new(station, now.date_naive(), fetched);
                self.store.save(&record).await?;
                return Ok(InstrumentsList {
                    record,
                    refreshed: true,
                });
            }
            Some(record) => record,
        };

        if !record.is_stale(now) {
            tracing::debug!(
                "Instrument cache for {} is fresh (last update {})",
                station,
                record.last_update
            );
            return Ok(InstrumentsList {
                record,
                refreshed: false,
            });
        }

        tracing::info!(
            "Instrument cache for {} is stale (last update {}), fetching new files",
            station,
            record.last_update
        );
        let mut record = record;
        let known = record.instruments.len();
        let fetched = self
            .catalog
            .get_station_instruments(station, record.last_update)
            .await?;
        record.merge(fetched, now);
        self.store.save(&record).await?;

        let added = record.instruments.len().saturating_sub(known);
        if added > 0 {
            tracing::info!("{} new instruments for {}", added, station);
        }

        Ok(InstrumentsList {
            record,
            refreshed: true,
        })
    }
}
