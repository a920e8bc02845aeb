//! Zone health-check listing over the Cloudflare v4 REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{HealthCheckEntry, HealthCheckSource, UpstreamError};

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Deserialize)]
struct ListingResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<Vec<HealthCheckEntry>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// [`HealthCheckSource`] backed by `GET /zones/{zone}/healthchecks`.
pub struct CloudflareHealthChecks {
    client: Client,
    url: String,
    api_token: String,
}

impl CloudflareHealthChecks {
    /// Build a source for one zone. `base_url` is normally [`DEFAULT_API_URL`].
    pub fn new(base_url: &str, zone_id: &str, api_token: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/zones/{}/healthchecks", base_url.trim_end_matches('/'), zone_id),
            api_token: api_token.into(),
        })
    }
}

#[async_trait]
impl HealthCheckSource for CloudflareHealthChecks {
    async fn list_checks(&self) -> Result<Vec<HealthCheckEntry>, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        let body: ListingResponse = response.json().await?;

        if !status.is_success() || !body.success {
            let message = body
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: if message.is_empty() { "unknown error".into() } else { message },
            });
        }

        let Some(checks) = body.result else {
            return Err(UpstreamError::Decode("listing has no result".into()));
        };
        debug!("health-check listing returned {} entries", checks.len());
        Ok(checks)
    }
}
