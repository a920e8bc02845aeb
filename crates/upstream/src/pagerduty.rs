//! Incident delivery over the PagerDuty Events API v2.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{AlertPayload, IncidentSink, UpstreamError};

/// Default events endpoint.
pub const DEFAULT_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// [`IncidentSink`] that POSTs each alert as JSON to the events endpoint.
pub struct PagerDutyEvents {
    client: Client,
    url: String,
}

impl PagerDutyEvents {
    pub fn new(url: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl IncidentSink for PagerDutyEvents {
    async fn enqueue(&self, alert: &AlertPayload) -> Result<(), UpstreamError> {
        let response = self.client.post(&self.url).json(alert).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(dedup_key = %alert.dedup_key, "incident event accepted ({})", status);
            return Ok(());
        }

        // The body is best effort: a proxy error page is not JSON.
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        Err(UpstreamError::Api {
            status: status.as_u16(),
            message: body.message.unwrap_or_else(|| "unknown error".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertAction, IncidentDetails, Severity};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn alert(routing_key: &str) -> AlertPayload {
        AlertPayload {
            routing_key: routing_key.into(),
            event_action: AlertAction::Trigger,
            dedup_key: "svc".into(),
            payload: IncidentDetails {
                summary: "svc-web is Unhealthy: timeout".into(),
                source: "svc".into(),
                severity: Severity::Critical,
                component: "web".into(),
            },
        }
    }

    async fn enqueue(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        match body["routing_key"].as_str() {
            Some("good") => (
                StatusCode::ACCEPTED,
                Json(json!({ "status": "success", "dedup_key": body["dedup_key"] })),
            ),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "invalid event", "message": "Event object is invalid" })),
            ),
        }
    }

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/v2/enqueue", post(enqueue))
            .route("/broken", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn accepted_event_is_ok() {
        let base = spawn_server().await;
        let sink = PagerDutyEvents::new(format!("{base}/v2/enqueue")).unwrap();
        sink.enqueue(&alert("good")).await.expect("2xx should be success");
    }

    #[tokio::test]
    async fn rejected_event_carries_upstream_message() {
        let base = spawn_server().await;
        let sink = PagerDutyEvents::new(format!("{base}/v2/enqueue")).unwrap();

        let err = sink.enqueue(&alert("bad")).await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Api { status: 400, message: "Event object is invalid".into() }
        );
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_unknown_error() {
        let base = spawn_server().await;
        let sink = PagerDutyEvents::new(format!("{base}/broken")).unwrap();

        let err = sink.enqueue(&alert("good")).await.unwrap_err();
        assert_eq!(err, UpstreamError::Api { status: 502, message: "unknown error".into() });
    }
}
