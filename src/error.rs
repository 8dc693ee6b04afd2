// Error kinds shared by all components
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = CcresError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CcresError {
    /// Timeout or connection failure, returned once retries are exhausted
    #[error("transport error while {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote API answered with a non-success status
    #[error("{context} rejected with status {status}: {body}")]
    RemoteRejected {
        context: String,
        status: u16,
        body: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cache file {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response while {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CcresError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn template(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Template {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
