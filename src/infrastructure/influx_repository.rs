// InfluxDB repository implementation
use crate::application::telemetry_repository::{FieldQuery, PidSeries, TelemetryRepository};
use crate::domain::statistics::TimeSeriesPoint;
use crate::error::{CcresError, Result};
use crate::infrastructure::config::HttpSettings;
use crate::infrastructure::http;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const MEASUREMENT: &str = "housekeeping";
const STATION_TAG: &str = "site_id";

const HOURLY_MEANS_QUERY: &str = "SELECT mean(\"${field}\") AS \"value\" FROM \"housekeeping\" \
WHERE \"site_id\" = '${station}' AND \"instrument_id\" = '${instrument}' \
AND time >= '${start}' AND time <= '${stop}' \
GROUP BY time(1h), \"instrument_pid\" fill(none)";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: Client,
    host: String,
    token: String,
    database: String,
    http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

/// Replace `${name}` placeholders in a query string
pub fn prepare_query(query: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Escape a value for use inside an InfluxQL single-quoted string literal
fn quote_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Escape a value for use inside an InfluxQL double-quoted identifier
fn quote_identifier(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl InfluxRepository {
    /// `host` includes scheme and port, `database` is the bucket name
    /// (InfluxDB 2 serves InfluxQL through its v1-compatible endpoint).
    pub fn new(client: Client, host: &str, token: String, database: String, http: HttpSettings) -> Self {
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            http,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        let encoded_db = urlencoding::encode(&self.database);
        format!("{}/query?db={}&q={}", self.host, encoded_db, encoded_query)
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);
        let context = "querying InfluxDB";

        tracing::debug!("Executing InfluxQL: {}", query);
        let response = http::send(
            || {
                self.client
                    .get(&url)
                    .header("Authorization", format!("Token {}", self.token))
                    .header("Accept", "application/json")
            },
            &self.http,
            context,
        )
        .await?;

        let data: InfluxQLResponse = http::json(response, context).await?;

        // Check for errors in the response
        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                return Err(CcresError::RemoteRejected {
                    context: context.to_string(),
                    status: 200,
                    body: error.clone(),
                });
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl TelemetryRepository for InfluxRepository {
    async fn list_station_ids(&self) -> Result<Vec<String>> {
        let query = format!("SHOW TAG VALUES FROM \"{MEASUREMENT}\" WITH KEY = \"{STATION_TAG}\"");
        let response = self.execute_query(&query).await?;

        let mut stations = Vec::new();
        if let Some(result) = response.results.first() {
            if let Some(series) = &result.series {
                for s in series {
                    for value_row in &s.values {
                        if value_row.len() >= 2 {
                            if let Some(station) = value_row[1].as_str() {
                                stations.push(station.to_string());
                            }
                        }
                    }
                }
            }
        }

        Ok(stations)
    }

    async fn hourly_means(&self, query: FieldQuery<'_>) -> Result<Vec<PidSeries>> {
        let vars = HashMap::from([
            ("field", quote_identifier(query.field)),
            ("station", quote_literal(query.station)),
            ("instrument", quote_literal(query.instrument_type)),
            ("start", query.window.start_rfc3339()),
            ("stop", query.window.end_rfc3339()),
        ]);
        let influxql = prepare_query(HOURLY_MEANS_QUERY, &vars);
        let response = self.execute_query(&influxql).await?;

        let mut by_pid: BTreeMap<String, Vec<TimeSeriesPoint>> = BTreeMap::new();
        if let Some(result) = response.results.first() {
            if let Some(series) = &result.series {
                for s in series {
                    let Some(pid) = s.tags.as_ref().and_then(|t| t.get("instrument_pid")) else {
                        tracing::warn!("Series without instrument_pid tag for {}", query.station);
                        continue;
                    };

                    let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
                    let value_idx = s.columns.iter().position(|c| c == "value").unwrap_or(1);

                    let points = by_pid.entry(pid.clone()).or_default();
                    for value_row in &s.values {
                        if value_row.len() > time_idx && value_row.len() > value_idx {
                            if let (Some(time_str), Some(value)) = (
                                value_row[time_idx].as_str(),
                                value_row[value_idx].as_f64(),
                            ) {
                                if let Ok(time) = chrono::DateTime::parse_from_rfc3339(time_str) {
                                    points.push(TimeSeriesPoint::new(time.timestamp_millis(), value));
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(by_pid
            .into_iter()
            .map(|(instrument_pid, points)| PidSeries {
                instrument_pid,
                points,
            })
            .collect())
    }
}
