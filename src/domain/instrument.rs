// Instrument and station domain models
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An instrument as listed by the catalog. Two instruments are the same
/// only if all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub pid: String,
    pub name: String,
}

impl Instrument {
    pub fn new(id: impl Into<String>, pid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pid: pid.into(),
            name: name.into(),
        }
    }

    /// Shorten a handle PID to the first 8 characters of the second
    /// `.`-separated piece of its last path segment.
    ///
    /// `https://hdl.handle.net/21.12132/3.191564170f8a4686` gives `19156417`.
    pub fn short_pid(&self) -> Option<String> {
        let last = self.pid.trim_end_matches('/').rsplit('/').next()?;
        let suffix = last.split('.').nth(1)?;
        if suffix.is_empty() {
            return None;
        }
        Some(suffix.chars().take(8).collect())
    }

    /// Grafana UID of the housekeeping dashboard of this instrument at `station`
    pub fn dashboard_uid(&self, station: &str) -> Option<String> {
        let short = self.short_pid()?;
        Some(format!(
            "ccres-{}-hkd-{}-{}",
            self.id.replace('-', ""),
            station,
            short
        ))
    }
}

/// Drop repeated instruments, keeping the first occurrence of each.
pub fn dedup_instruments<I>(instruments: I) -> Vec<Instrument>
where
    I: IntoIterator<Item = Instrument>,
{
    let mut seen = HashSet::new();
    instruments
        .into_iter()
        .filter(|instrument| seen.insert(instrument.clone()))
        .collect()
}

/// A catalog station. Only stations with an ACTRIS id belong to CCRES.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    pub id: String,
    #[serde(rename = "actrisId", default)]
    pub actris_id: Option<serde_json::Value>,
    #[serde(rename = "humanReadableName", default)]
    pub name: Option<String>,
}

impl Station {
    pub fn is_actris(&self) -> bool {
        matches!(&self.actris_id, Some(value) if !value.is_null())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
