use ccres_grafana::presentation::commands;
use chrono::{TimeZone, Utc};
use std::process::ExitCode;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> String {
    format!(
        r#"
[http]
retries = 0

[influxdb]
url = "http://{}"
port = {}
token = "influx-token"
org = "ccres"
bucket = "ccres"

[hkds.chm15k]
param = ["temp_int"]

[hkds.chm15k.stats_thresh]
temp_int = 40.0
"#,
        server.address().ip(),
        server.address().port()
    )
}

#[tokio::test]
async fn test_stats_report_written_for_previous_month() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param(
            "q",
            "SHOW TAG VALUES FROM \"housekeeping\" WITH KEY = \"site_id\"",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "statement_id": 0,
                "series": [{"name": "housekeeping", "columns": ["key", "value"], "values": [["site_id", "palaiseau"]]}]
            }]
        })))
        .mount(&server)
        .await;

    let april_query = "SELECT mean(\"temp_int\") AS \"value\" FROM \"housekeeping\" \
WHERE \"site_id\" = 'palaiseau' AND \"instrument_id\" = 'chm15k' \
AND time >= '2024-04-01T00:00:00Z' AND time <= '2024-04-30T23:59:59Z' \
GROUP BY time(1h), \"instrument_pid\" fill(none)";

    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("db", "ccres"))
        .and(query_param("q", april_query))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "statement_id": 0,
                "series": [{
                    "name": "housekeeping",
                    "tags": {"instrument_pid": "pid-a"},
                    "columns": ["time", "value"],
                    "values": [
                        ["2024-04-01T00:00:00Z", 45.0],
                        ["2024-04-01T01:00:00Z", 20.0],
                        ["2024-04-01T02:00:00Z", 20.0],
                        ["2024-04-01T03:00:00Z", 20.0]
                    ]
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, config(&server)).unwrap();
    let output = dir.path().join("stats.json");
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

    let code = commands::run_stats(&config_path, &output, "chm15k", None, now)
        .await
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(
        report,
        serde_json::json!({"palaiseau": {"temp_int": {"pid-a": 25.0}}})
    );
}

#[tokio::test]
async fn test_missing_threshold_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let contents = config(&server).replace("temp_int = 40.0", "");
    std::fs::write(&config_path, contents).unwrap();

    let err = commands::run_stats(&config_path, &dir.path().join("out.json"), "chm15k", None, Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("hkds.chm15k.stats_thresh.temp_int"));
}

#[tokio::test]
async fn test_invalid_month_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, config(&server)).unwrap();

    let err = commands::run_stats(
        &config_path,
        &dir.path().join("out.json"),
        "chm15k",
        Some("2024-13"),
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("invalid month"));
}
