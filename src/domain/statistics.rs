// Housekeeping statistics domain models
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::collections::BTreeMap;

/// Hourly mean of one housekeeping field
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// station -> field -> instrument pid -> percentage (None when no valid sample)
pub type StatsReport = BTreeMap<String, BTreeMap<String, BTreeMap<String, Option<f64>>>>;

/// Percentage of valid (finite, non-negative) samples strictly above
/// `threshold`. `None` when there is no valid sample.
pub fn exceedance_percentage(points: &[TimeSeriesPoint], threshold: f64) -> Option<f64> {
    let valid: Vec<f64> = points
        .iter()
        .map(|p| p.value)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();

    if valid.is_empty() {
        return None;
    }

    let above = valid.iter().filter(|v| **v > threshold).count();
    Some(100.0 * above as f64 / valid.len() as f64)
}

/// Inclusive time window of one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// First day 00:00:00Z to last day 23:59:59Z of the month containing `day`
    pub fn containing(day: NaiveDate) -> Self {
        let first = day.with_day(1).unwrap_or(day);
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .unwrap_or(first);

        let start = first.and_time(NaiveTime::default()).and_utc();
        let end = next_first.and_time(NaiveTime::default()).and_utc() - TimeDelta::seconds(1);
        Self { start, end }
    }

    /// The calendar month before the one containing `now`
    pub fn previous_month(now: DateTime<Utc>) -> Self {
        let first_this_month = now.date_naive().with_day(1).unwrap_or(now.date_naive());
        let last_previous = first_this_month - TimeDelta::days(1);
        Self::containing(last_previous)
    }

    /// Parse `YYYY-MM`
    pub fn parse_month(raw: &str) -> Option<Self> {
        let day = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()?;
        Some(Self::containing(day))
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}
