// JSON file store for per-station instrument caches
use crate::domain::instrument_cache::InstrumentCacheRecord;
use crate::error::{CcresError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, station: &str) -> PathBuf {
        self.dir.join(format!("{station}.json"))
    }

    /// Read the cache of `station`. A missing file means the station was never
    /// cached; an unreadable one is reported and treated the same way so the
    /// next save replaces it.
    pub async fn load(&self, station: &str) -> Option<InstrumentCacheRecord> {
        let path = self.path_for(station);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read cache {}: {}; refetching", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<InstrumentCacheRecord>(&raw) {
            Ok(record) if record.station == station => Some(record),
            Ok(record) => {
                tracing::warn!(
                    "Cache {} belongs to station {}; refetching",
                    path.display(),
                    record.station
                );
                None
            }
            Err(e) => {
                tracing::warn!("Corrupt cache {}: {}; refetching", path.display(), e);
                None
            }
        }
    }

    /// Replace the cache file of the record's station. The record is written to
    /// a temporary file next to the target and renamed over it.
    pub async fn save(&self, record: &InstrumentCacheRecord) -> Result<()> {
        let path = self.path_for(&record.station);
        let contents = serde_json::to_vec_pretty(record).map_err(|e| CcresError::Cache {
            path: path.clone(),
            source: e.into(),
        })?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &contents))
            .await
            .map_err(std::io::Error::other)
            .and_then(|written| written)
            .map_err(|source| CcresError::Cache {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            "Saved {} instruments to {}",
            record.instruments.len(),
            path.display()
        );
        Ok(())
    }
}

fn write_atomically(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use chrono::NaiveDate;

    fn record(station: &str) -> InstrumentCacheRecord {
        InstrumentCacheRecord::new(
            station,
            NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
            vec![Instrument::new(
                "chm15k",
                "https://hdl.handle.net/21.12132/3.191564170f8a4686",
                "Lufft CHM15k",
            )],
        )
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.load("palaiseau").await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("cache"));

        store.save(&record("palaiseau")).await.unwrap();

        assert_eq!(store.load("palaiseau").await, Some(record("palaiseau")));
        let raw = std::fs::read_to_string(store.path_for("palaiseau")).unwrap();
        assert!(raw.contains("\"last_update\": \"2024-05-09\""));
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        store.save(&record("palaiseau")).await.unwrap();
        let mut updated = record("palaiseau");
        updated.instruments.clear();
        store.save(&updated).await.unwrap();

        assert_eq!(store.load("palaiseau").await, Some(updated));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        std::fs::write(store.path_for("palaiseau"), "{\"station\": \"palai").unwrap();

        assert!(store.load("palaiseau").await.is_none());
    }

    #[tokio::test]
    async fn test_foreign_station_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.save(&record("lindenberg")).await.unwrap();
        std::fs::copy(store.path_for("lindenberg"), store.path_for("palaiseau")).unwrap();

        assert!(store.load("palaiseau").await.is_none());
    }

    #[tokio::test]
    async fn test_hand_edited_duplicates_are_collapsed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let entry = r#"{"id": "chm15k", "pid": "https://hdl.handle.net/21.12132/3.191564170f8a4686", "name": "Lufft CHM15k"}"#;
        std::fs::write(
            store.path_for("palaiseau"),
            format!(r#"{{"station": "palaiseau", "last_update": "2024-05-09", "instruments": [{entry}, {entry}]}}"#),
        )
        .unwrap();

        assert_eq!(store.load("palaiseau").await, Some(record("palaiseau")));
    }
}
