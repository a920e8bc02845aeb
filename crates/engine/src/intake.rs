//! Admission of inbound health-check notifications.
//!
//! Everything here runs before a workflow run exists: a rejected notification
//! never reaches the run store.
//!
//! A notification looks like this:
//!
//! ```json
//! {
//!   "name": "test",
//!   "text": "Freeform text version of alert data",
//!   "data": {
//!     "time": "2023-08-12 05:16:49 +0000 UTC",
//!     "status": "Unhealthy",
//!     "reason": "TCP connection failed",
//!     "name": "scandal-web",
//!     "health_check_id": "5334d6fbfc9f170315cc51e29e8a350a"
//!   },
//!   "ts": 1691817413,
//!   "alert_type": "health_check_status_notification"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};

use crate::models::{HealthEvent, HealthStatus};
use crate::routing::{RoutingKey, RoutingTable};
use crate::EngineError;

/// The only `alert_type` that starts a workflow.
pub const HEALTH_CHECK_ALERT_TYPE: &str = "health_check_status_notification";

/// Prefix of the `text` field of the test message sent when a webhook is
/// registered. Registration fails unless the test is acknowledged.
pub const CONNECTIVITY_TEST_PREFIX: &str = "Hello World!";

/// Inbound webhook body. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub text: String,
    /// Unix seconds at which the notification was emitted.
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
    /// Check name, `service-component`.
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
}

/// Outcome of a successful admission.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Registration ping; acknowledge and do nothing.
    ConnectivityTest,
    /// Start a workflow run for this event.
    Accepted {
        event: HealthEvent,
        routing_key: RoutingKey,
    },
}

/// Validate a notification and resolve its routing key.
///
/// `received_at` stands in for the observation time when `ts` is absent.
pub fn admit(
    notification: &Notification,
    routing: &RoutingTable,
    received_at: DateTime<Utc>,
) -> Result<Admission, EngineError> {
    if notification.text.starts_with(CONNECTIVITY_TEST_PREFIX) {
        info!("test notification");
        return Ok(Admission::ConnectivityTest);
    }

    if notification.alert_type != HEALTH_CHECK_ALERT_TYPE {
        error!("bad request: alert_type '{}'", notification.alert_type);
        return Err(EngineError::UnsupportedAlertType(notification.alert_type.clone()));
    }

    let data = notification.data.as_ref().ok_or(EngineError::MissingData)?;

    let observed_at = notification
        .ts
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or(received_at);
    let event = HealthEvent::new(
        data.name.as_str(),
        HealthStatus::from_notification(&data.status),
        data.reason.as_str(),
        observed_at,
    );

    let Some(routing_key) = routing.lookup(&event.service_name) else {
        error!("service not found: {}", event.service_name);
        return Err(EngineError::UnknownService(event.service_name));
    };

    info!("got {} notification for {}", event.status, event.check_name);
    Ok(Admission::Accepted {
        routing_key: routing_key.clone(),
        event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn routing() -> RoutingTable {
        let mut table = RoutingTable::new();
        table.insert("scandal", RoutingKey::new("rk-scandal"));
        table
    }

    fn parse(value: serde_json::Value) -> Notification {
        serde_json::from_value(value).expect("valid notification")
    }

    #[test]
    fn accepts_status_notification() {
        let n = parse(json!({
            "alert_type": "health_check_status_notification",
            "text": "scandal-web is unhealthy",
            "ts": 1691817413,
            "data": { "name": "scandal-web", "status": "Unhealthy", "reason": "TCP connection failed", "preview": false },
        }));

        match admit(&n, &routing(), Utc::now()).unwrap() {
            Admission::Accepted { event, routing_key } => {
                assert_eq!(event.service_name, "scandal");
                assert_eq!(event.check_name, "scandal-web");
                assert_eq!(event.status, HealthStatus::Unhealthy);
                assert_eq!(event.reason, "TCP connection failed");
                assert_eq!(event.observed_at.timestamp(), 1691817413);
                assert_eq!(routing_key.expose(), "rk-scandal");
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn connectivity_test_is_acknowledged_before_type_check() {
        let n = parse(json!({ "text": "Hello World! This is a test", "alert_type": "" }));
        assert_eq!(admit(&n, &routing(), Utc::now()).unwrap(), Admission::ConnectivityTest);
    }

    #[test]
    fn wrong_alert_type_is_rejected() {
        let n = parse(json!({
            "alert_type": "universal_ssl_event_type",
            "text": "cert",
            "data": { "name": "scandal-web", "status": "Healthy" },
        }));
        let err = admit(&n, &routing(), Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedAlertType(ref t) if t == "universal_ssl_event_type"));
        assert!(err.is_rejected_input());
    }

    #[test]
    fn unknown_service_is_rejected() {
        let n = parse(json!({
            "alert_type": HEALTH_CHECK_ALERT_TYPE,
            "text": "",
            "data": { "name": "ghost-web", "status": "Unhealthy", "reason": "x" },
        }));
        let err = admit(&n, &routing(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "service ghost not found");
    }

    #[test]
    fn missing_data_is_rejected() {
        let n = parse(json!({ "alert_type": HEALTH_CHECK_ALERT_TYPE, "text": "" }));
        assert!(matches!(admit(&n, &routing(), Utc::now()), Err(EngineError::MissingData)));
    }

    #[test]
    fn receipt_time_is_used_without_ts() {
        let received_at = Utc::now();
        let n = parse(json!({
            "alert_type": HEALTH_CHECK_ALERT_TYPE,
            "data": { "name": "scandal-web", "status": "Healthy", "reason": "ok" },
        }));
        match admit(&n, &routing(), received_at).unwrap() {
            Admission::Accepted { event, .. } => assert_eq!(event.observed_at, received_at),
            other => panic!("expected acceptance, got {other:?}"),
        }
    }
}
