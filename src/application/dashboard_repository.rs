// Repository trait for the dashboard-management API
use crate::domain::dashboard::Dashboard;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Folder {
    pub uid: String,
    pub title: String,
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Create a folder and return its uid
    async fn create_folder(&self, title: &str) -> Result<String>;

    /// Upload `dashboard` into `folder_uid`, replacing any dashboard with the same uid
    async fn upload_dashboard(&self, dashboard: &Dashboard, folder_uid: &str) -> Result<()>;
}
