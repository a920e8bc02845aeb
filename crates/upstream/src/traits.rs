//! The transport contracts the engine calls through.

use async_trait::async_trait;

use crate::{AlertPayload, HealthCheckEntry, UpstreamError};

/// Lists every health check configured for one zone.
#[async_trait]
pub trait HealthCheckSource: Send + Sync {
    /// Fetch the full listing. An error-flagged response is an `Err`.
    async fn list_checks(&self) -> Result<Vec<HealthCheckEntry>, UpstreamError>;
}

/// Accepts alerts for the incident-management backend.
#[async_trait]
pub trait IncidentSink: Send + Sync {
    /// Deliver one alert. `Ok` means the backend answered 2xx.
    async fn enqueue(&self, alert: &AlertPayload) -> Result<(), UpstreamError>;
}
