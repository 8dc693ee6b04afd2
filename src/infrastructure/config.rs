use crate::error::{CcresError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLOUDNET_URL: &str = "https://cloudnet.fmi.fi/api";
pub const ENV_PREFIX: &str = "CCRES";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsSettings,
    #[serde(default)]
    pub cloudnet: CloudnetSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentTemplates>,
    pub grafana: Option<GrafanaSettings>,
    pub influxdb: Option<InfluxSettings>,
    #[serde(default)]
    pub hkds: BTreeMap<String, HkdSettings>,

    /// Directory of the config file, relative paths are resolved against it
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsSettings {
    #[serde(default = "default_templates_dir")]
    pub templates: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache: PathBuf,
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            templates: default_templates_dir(),
            cache: default_cache_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudnetSettings {
    #[serde(default = "default_cloudnet_url")]
    pub url: String,
}

impl Default for CloudnetSettings {
    fn default() -> Self {
        Self {
            url: default_cloudnet_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// The raw-file listing is large and gets its own timeout
    #[serde(default = "default_instruments_timeout_secs")]
    pub instruments_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            instruments_timeout_secs: default_instruments_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn instruments_timeout(&self) -> Duration {
        Duration::from_secs(self.instruments_timeout_secs)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InstrumentTemplates {
    #[serde(rename = "one-site")]
    pub one_site: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrafanaSettings {
    pub url: String,
    pub token: String,
    pub influx_ql_uid: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub url: String,
    #[serde(default = "default_influx_port")]
    pub port: u16,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl InfluxSettings {
    pub fn host(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HkdSettings {
    pub param: Vec<String>,
    #[serde(default)]
    pub stats_thresh: BTreeMap<String, f64>,
}

impl HkdSettings {
    /// Fields paired with their threshold; every field must have one
    pub fn thresholds(&self, instrument_type: &str) -> Result<Vec<(String, f64)>> {
        self.param
            .iter()
            .map(|field| {
                self.stats_thresh
                    .get(field)
                    .map(|thresh| (field.clone(), *thresh))
                    .ok_or_else(|| {
                        CcresError::config(format!(
                            "missing key hkds.{instrument_type}.stats_thresh.{field}"
                        ))
                    })
            })
            .collect()
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_cloudnet_url() -> String {
    DEFAULT_CLOUDNET_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_instruments_timeout_secs() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_influx_port() -> u16 {
    8086
}

impl AppConfig {
    /// Load a TOML config file, with `CCRES__SECTION__KEY` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    pub fn load_with_env(path: &Path, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(env)
            .build()
            .map_err(|e| CcresError::config(format!("{}: {e}", path.display())))?;

        let mut app: AppConfig = settings
            .try_deserialize()
            .map_err(|e| CcresError::config(format!("{}: {e}", path.display())))?;

        app.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(app)
    }

    pub fn grafana(&self) -> Result<&GrafanaSettings> {
        self.grafana
            .as_ref()
            .ok_or_else(|| CcresError::config("missing [grafana] section"))
    }

    pub fn influxdb(&self) -> Result<&InfluxSettings> {
        self.influxdb
            .as_ref()
            .ok_or_else(|| CcresError::config("missing [influxdb] section"))
    }

    pub fn hkds(&self, instrument_type: &str) -> Result<&HkdSettings> {
        self.hkds
            .get(instrument_type)
            .ok_or_else(|| CcresError::config(format!("missing [hkds.{instrument_type}] section")))
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.templates)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.cache)
    }

    /// Instrument type -> resolved template path
    pub fn dashboard_templates(&self) -> BTreeMap<String, PathBuf> {
        let dir = self.templates_dir();
        self.instruments
            .iter()
            .map(|(instrument, templates)| (instrument.clone(), dir.join(&templates.one_site)))
            .collect()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONFIG: &str = r#"
[instruments.chm15k]
one-site = "chm15k_one_site.json"

[instruments.basta]
one-site = "basta/one_site.json"

[grafana]
url = "https://grafana.example.org"
token = "file-token"
influx_ql_uid = "P951FEA4DE68E13C5"

[influxdb]
url = "http://influx.example.org"
token = "influx-token"
org = "ccres"
bucket = "ccres"

[hkds.chm15k]
param = ["laser_life_time", "temp_int"]

[hkds.chm15k.stats_thresh]
laser_life_time = 15000.0
temp_int = 40.0
"#;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn no_env() -> config::Environment {
        environment().source(Some(HashMap::new()))
    }

    #[test]
    fn test_load_with_defaults() {
        let (dir, path) = write_config(CONFIG);
        let config = AppConfig::load_with_env(&path, no_env()).unwrap();

        assert_eq!(config.http, HttpSettings::default());
        assert_eq!(config.cloudnet.url, DEFAULT_CLOUDNET_URL);
        assert_eq!(config.cache_dir(), dir.path().join("cache"));
        assert_eq!(config.grafana().unwrap().influx_ql_uid, "P951FEA4DE68E13C5");
        assert_eq!(config.influxdb().unwrap().host(), "http://influx.example.org:8086");

        let templates = config.dashboard_templates();
        assert_eq!(
            templates.get("chm15k"),
            Some(&dir.path().join("templates").join("chm15k_one_site.json"))
        );
        assert_eq!(
            templates.get("basta"),
            Some(&dir.path().join("templates").join("basta/one_site.json"))
        );
    }

    #[test]
    fn test_thresholds() {
        let (_dir, path) = write_config(CONFIG);
        let config = AppConfig::load_with_env(&path, no_env()).unwrap();

        let thresholds = config.hkds("chm15k").unwrap().thresholds("chm15k").unwrap();
        assert_eq!(
            thresholds,
            vec![
                ("laser_life_time".to_string(), 15000.0),
                ("temp_int".to_string(), 40.0)
            ]
        );
        assert!(config.hkds("hatpro").is_err());
    }

    #[test]
    fn test_missing_threshold_names_the_key() {
        let settings = HkdSettings {
            param: vec!["temp_det".to_string()],
            stats_thresh: BTreeMap::new(),
        };
        let err = settings.thresholds("chm15k").unwrap_err().to_string();
        assert!(err.contains("hkds.chm15k.stats_thresh.temp_det"), "{err}");
    }

    #[test]
    fn test_missing_grafana_token_is_reported() {
        let (_dir, path) = write_config(
            r#"
[grafana]
url = "https://grafana.example.org"
influx_ql_uid = "abc"
"#,
        );
        let err = AppConfig::load_with_env(&path, no_env()).unwrap_err().to_string();
        assert!(err.contains("token"), "{err}");
    }

    #[test]
    fn test_missing_section() {
        let (_dir, path) = write_config("[instruments]\n");
        let config = AppConfig::load_with_env(&path, no_env()).unwrap();
        assert!(matches!(config.grafana(), Err(CcresError::Config(_))));
        assert!(matches!(config.influxdb(), Err(CcresError::Config(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let (_dir, path) = write_config(CONFIG);
        let env = environment().source(Some(HashMap::from([(
            "CCRES__GRAFANA__TOKEN".to_string(),
            "env-token".to_string(),
        )])));

        let config = AppConfig::load_with_env(&path, env).unwrap();
        assert_eq!(config.grafana().unwrap().token, "env-token");
    }

    #[test]
    fn test_backoff_doubles() {
        let http = HttpSettings::default();
        assert_eq!(http.backoff(0), Duration::from_millis(500));
        assert_eq!(http.backoff(2), Duration::from_millis(2000));
    }
}
