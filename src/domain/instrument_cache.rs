// Per-station instrument cache record
use super::instrument::{dedup_instruments, Instrument};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Oldest date with housekeeping data in the network
pub const CCRES_HKD_OLDEST_DATA: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(date) => date,
    None => panic!("invalid epoch date"),
};

/// On-disk layout of `<cache_dir>/<station>.json`.
///
/// `last_update` only keeps the day, so staleness is measured from midnight
/// UTC of that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentCacheRecord {
    pub station: String,
    #[serde(with = "day_format")]
    pub last_update: NaiveDate,
    #[serde(deserialize_with = "deserialize_distinct")]
    pub instruments: Vec<Instrument>,
}

/// Cache files may be edited by hand; repeated triples are dropped on load.
fn deserialize_distinct<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Instrument>, D::Error> {
    let instruments = Vec::<Instrument>::deserialize(deserializer)?;
    Ok(dedup_instruments(instruments))
}

impl InstrumentCacheRecord {
    pub fn new(station: impl Into<String>, last_update: NaiveDate, instruments: Vec<Instrument>) -> Self {
        Self {
            station: station.into(),
            last_update,
            instruments: dedup_instruments(instruments),
        }
    }

    /// More than one day elapsed since the start of the recorded day
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let recorded = self.last_update.and_time(NaiveTime::default()).and_utc();
        now - recorded > TimeDelta::days(1)
    }

    /// Append `fetched` after the known instruments and drop repeats.
    pub fn merge(&mut self, fetched: Vec<Instrument>, now: DateTime<Utc>) {
        let existing = std::mem::take(&mut self.instruments);
        self.instruments = dedup_instruments(existing.into_iter().chain(fetched));
        self.last_update = now.date_naive();
    }
}

mod day_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const DATE_FMT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FMT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(serde::de::Error::custom)
    }
}
