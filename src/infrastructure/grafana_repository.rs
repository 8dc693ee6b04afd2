// Grafana HTTP API adapter
use crate::application::dashboard_repository::{DashboardRepository, Folder};
use crate::domain::dashboard::Dashboard;
use crate::error::{CcresError, Result};
use crate::infrastructure::config::HttpSettings;
use crate::infrastructure::http;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GrafanaRepository {
    client: Client,
    url: String,
    token: String,
    http: HttpSettings,
}

#[derive(Debug, Serialize)]
struct NewFolder<'a> {
    title: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    uid: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardUpload<'a> {
    dashboard: &'a serde_json::Value,
    folder_uid: &'a str,
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
struct UploadedDashboard {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

impl GrafanaRepository {
    pub fn new(client: Client, url: &str, token: String, http: HttpSettings) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
            http,
        }
    }

    fn url_folders(&self) -> String {
        format!("{}/api/folders", self.url)
    }

    fn url_dashboards(&self) -> String {
        format!("{}/api/dashboards/db", self.url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl DashboardRepository for GrafanaRepository {
    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let url = self.url_folders();
        let context = "listing Grafana folders";

        let response = http::send(|| self.authorized(self.client.get(&url)), &self.http, context).await?;
        http::json(response, context).await
    }

    async fn create_folder(&self, title: &str) -> Result<String> {
        let url = self.url_folders();
        let context = format!("creating Grafana folder {title}");
        let body = NewFolder { title };

        let sent = http::send(
            || self.authorized(self.client.post(&url)).json(&body),
            &self.http,
            &context,
        )
        .await;

        // A retried create whose first attempt landed is answered with 409
        let response = match sent {
            Err(CcresError::RemoteRejected { status: 409, body, .. }) => {
                tracing::warn!("Folder {} already exists ({}), looking it up", title, body);
                let existing = self.list_folders().await?;
                return existing
                    .into_iter()
                    .find(|folder| folder.title == title)
                    .map(|folder| folder.uid)
                    .ok_or_else(|| CcresError::RemoteRejected {
                        context,
                        status: 409,
                        body,
                    });
            }
            other => other?,
        };
        let created: CreatedFolder = http::json(response, &context).await?;
        Ok(created.uid)
    }

    async fn upload_dashboard(&self, dashboard: &Dashboard, folder_uid: &str) -> Result<()> {
        let url = self.url_dashboards();
        let context = format!(
            "uploading dashboard {}",
            dashboard.uid().unwrap_or("<no uid>")
        );
        let body = DashboardUpload {
            dashboard: &dashboard.document,
            folder_uid,
            overwrite: true,
        };

        let response = http::send(
            || self.authorized(self.client.post(&url)).json(&body),
            &self.http,
            &context,
        )
        .await?;
        let uploaded: UploadedDashboard = http::json(response, &context).await?;

        tracing::debug!(
            "Dashboard {} stored as version {} at {}",
            uploaded.uid.as_deref().unwrap_or("?"),
            uploaded.version.unwrap_or_default(),
            uploaded.url.as_deref().unwrap_or("?")
        );
        Ok(())
    }
}
