// Dashboard domain model - template token substitution
use super::instrument::Instrument;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Placeholder tokens understood by the dashboard templates
pub const TOKENS: [&str; 7] = [
    "dashboard_uid",
    "site_id",
    "influx_ql_uid",
    "pid",
    "instrument_id",
    "pid_short",
    "instrument_name",
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("root is not a JSON object")]
    NotAnObject,
}

/// Replacement values keyed by bare token name (without braces)
#[derive(Debug, Clone, Default)]
pub struct Replacements(BTreeMap<String, String>);

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, value: impl Into<String>) -> Self {
        self.0.insert(token.to_string(), value.into());
        self
    }

    /// Values for one instrument's housekeeping dashboard
    pub fn for_instrument(
        instrument: &Instrument,
        station: &str,
        dashboard_uid: &str,
        pid_short: &str,
        influx_ql_uid: &str,
    ) -> Self {
        Self::new()
            .with("dashboard_uid", dashboard_uid)
            .with("site_id", station)
            .with("influx_ql_uid", influx_ql_uid)
            .with("pid", instrument.pid.as_str())
            .with("instrument_id", instrument.id.as_str())
            .with("pid_short", pid_short)
            .with("instrument_name", instrument.name.as_str())
    }

    /// Replace every recognised `{{token}}` in one left-to-right pass, so
    /// replacement values are never substituted again.
    fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let value = after
                .find("}}")
                .and_then(|end| self.0.get(&after[..end]).map(|value| (value, end)));
            match value {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    out.push('{');
                    rest = &rest[start + 1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// A dashboard document ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub document: Value,
}

impl Dashboard {
    /// Parse `template` and substitute every `{{token}}` inside string values
    /// and object keys. The `id` field is always null in the result.
    pub fn from_template(template: &str, replacements: &Replacements) -> Result<Self, TemplateError> {
        let parsed: Value = serde_json::from_str(template)?;

        let Value::Object(root) = substitute(parsed, replacements) else {
            return Err(TemplateError::NotAnObject);
        };

        let mut root = root;
        root.insert("id".to_string(), Value::Null);

        Ok(Self {
            document: Value::Object(root),
        })
    }

    pub fn uid(&self) -> Option<&str> {
        self.document.get("uid").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.document.get("title").and_then(Value::as_str)
    }

    /// Recognised tokens still present after substitution
    pub fn unresolved_tokens(&self) -> Vec<&'static str> {
        let text = self.document.to_string();
        TOKENS
            .into_iter()
            .filter(|token| text.contains(&format!("{{{{{token}}}}}")))
            .collect()
    }
}

fn substitute(value: Value, replacements: &Replacements) -> Value {
    match value {
        Value::String(s) => Value::String(replacements.apply(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute(item, replacements))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (replacements.apply(&key), substitute(item, replacements)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
        "id": 42,
        "uid": "{{dashboard_uid}}",
        "title": "{{instrument_name}} ({{pid_short}}) - {{site_id}}",
        "tags": ["{{instrument_id}}", "housekeeping"],
        "panels": [{
            "datasource": {"type": "influxdb", "uid": "{{influx_ql_uid}}"},
            "links": [{"url": "{{pid}}"}],
            "fieldConfig": {"defaults": {"unit": "celsius"}},
            "gridPos": {"h": 8, "w": 12}
        }],
        "templating": {"list": [{"name": "{{site_id}}_var"}]}
    }"#;

    fn replacements() -> Replacements {
        let instrument = Instrument::new(
            "chm15k",
            "https://hdl.handle.net/21.12132/3.191564170f8a4686",
            "Lufft CHM15k",
        );
        Replacements::for_instrument(
            &instrument,
            "palaiseau",
            "ccres-chm15k-hkd-palaiseau-19156417",
            "19156417",
            "P951FEA4DE68E13C5",
        )
    }

    #[test]
    fn test_all_tokens_replaced_and_id_nulled() {
        let dashboard = Dashboard::from_template(TEMPLATE, &replacements()).unwrap();

        assert!(dashboard.unresolved_tokens().is_empty());
        assert!(!dashboard.document.to_string().contains("{{"));
        assert_eq!(dashboard.document["id"], Value::Null);
        assert_eq!(dashboard.uid(), Some("ccres-chm15k-hkd-palaiseau-19156417"));
        assert_eq!(
            dashboard.title(),
            Some("Lufft CHM15k (19156417) - palaiseau")
        );
        assert_eq!(
            dashboard.document["panels"][0]["datasource"]["uid"],
            "P951FEA4DE68E13C5"
        );
        assert_eq!(
            dashboard.document["panels"][0]["links"][0]["url"],
            "https://hdl.handle.net/21.12132/3.191564170f8a4686"
        );
        assert_eq!(dashboard.document["templating"]["list"][0]["name"], "palaiseau_var");
        assert_eq!(dashboard.document["panels"][0]["gridPos"]["w"], 12);
    }

    #[test]
    fn test_id_added_when_missing() {
        let dashboard = Dashboard::from_template(r#"{"uid": "x"}"#, &Replacements::new()).unwrap();
        assert_eq!(dashboard.document.get("id"), Some(&Value::Null));
    }

    #[test]
    fn test_values_with_json_metacharacters_stay_valid() {
        let replacements = Replacements::new().with("instrument_name", r#"Lufft "CHM15k" \ nimbus"#);
        let dashboard =
            Dashboard::from_template(r#"{"title": "{{instrument_name}}"}"#, &replacements).unwrap();

        assert_eq!(dashboard.title(), Some(r#"Lufft "CHM15k" \ nimbus"#));
        let reparsed: Value = serde_json::from_str(&dashboard.document.to_string()).unwrap();
        assert_eq!(reparsed, dashboard.document);
    }

    #[test]
    fn test_replacement_values_are_not_substituted_again() {
        let replacements = Replacements::new()
            .with("instrument_name", "{{site_id}} lidar")
            .with("site_id", "palaiseau");
        let dashboard = Dashboard::from_template(
            r#"{"title": "{{instrument_name}} at {{site_id}}", "legend": "{{{site_id}}} {{other}}"}"#,
            &replacements,
        )
        .unwrap();

        assert_eq!(dashboard.title(), Some("{{site_id}} lidar at palaiseau"));
        assert_eq!(dashboard.document["legend"], "{palaiseau} {{other}}");
    }

    #[test]
    fn test_token_in_object_key() {
        let replacements = Replacements::new().with("site_id", "lindenberg");
        let dashboard =
            Dashboard::from_template(r#"{"{{site_id}}": true}"#, &replacements).unwrap();
        assert_eq!(dashboard.document["lindenberg"], Value::Bool(true));
    }

    #[test]
    fn test_unresolved_tokens_reported() {
        let dashboard = Dashboard::from_template(
            r#"{"uid": "{{dashboard_uid}}", "legend": "{{instrument_pid}}"}"#,
            &Replacements::new(),
        )
        .unwrap();
        assert_eq!(dashboard.unresolved_tokens(), vec!["dashboard_uid"]);
    }

    #[test]
    fn test_malformed_template() {
        let err = Dashboard::from_template(r#"{"uid": {{dashboard_uid}}}"#, &replacements()).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed(_)));

        let err = Dashboard::from_template("[1, 2]", &replacements()).unwrap_err();
        assert!(matches!(err, TemplateError::NotAnObject));
        assert_eq!(err.to_string(), "root is not a JSON object");
    }
}
