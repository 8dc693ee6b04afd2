// Shared HTTP plumbing: client construction, retries and status mapping
use crate::error::{CcresError, Result};
use crate::infrastructure::config::HttpSettings;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// One client per remote system, built once per invocation
pub fn build_client(settings: &HttpSettings) -> Result<Client> {
    Client::builder()
        .timeout(settings.timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CcresError::Transport {
            context: "building HTTP client".to_string(),
            source: e,
        })
}

/// Send the request built by `build`, retrying transport failures with
/// exponential backoff. Non-2xx responses are returned as `RemoteRejected`
/// and never retried.
pub async fn send<F>(build: F, settings: &HttpSettings, context: &str) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match build().send().await {
            Ok(response) => return check_status(response, context).await,
            Err(e) if attempt < settings.retries && !e.is_builder() => {
                let delay = settings.backoff(attempt);
                tracing::warn!(
                    "Transport error while {} (attempt {}/{}): {}; retrying in {:?}",
                    context,
                    attempt + 1,
                    settings.retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(CcresError::Transport {
                    context: context.to_string(),
                    source: e,
                });
            }
        }
    }
}

async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CcresError::RemoteRejected {
        context: context.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Read the whole body and decode it as JSON
pub async fn json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let text = response.text().await.map_err(|e| CcresError::Transport {
        context: context.to_string(),
        source: e,
    })?;

    serde_json::from_str(&text).map_err(|e| CcresError::Decode {
        context: context.to_string(),
        source: e,
    })
}
