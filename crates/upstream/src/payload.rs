//! Wire types shared by the engine and the transports.
//!
//! Defined here (rather than in `engine`) so the transports can serialize an
//! alert without depending on the engine crate.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AlertAction / Severity
// ---------------------------------------------------------------------------

/// What the incident backend should do with the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    Trigger,
    Resolve,
}

impl fmt::Display for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Resolve => write!(f, "resolve"),
        }
    }
}

/// Alert severity. Only `Critical` pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Info => write!(f, "info"),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertPayload
// ---------------------------------------------------------------------------

/// The alert exactly as it is posted to the incident events endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub routing_key: String,
    pub event_action: AlertAction,
    /// All alerts of one service share this key so they land on one incident.
    pub dedup_key: String,
    pub payload: IncidentDetails,
}

/// The nested `payload` object of an incident event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDetails {
    pub summary: String,
    pub source: String,
    pub severity: Severity,
    pub component: String,
}

// The routing key is a credential; keep it out of logs.
impl fmt::Debug for AlertPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertPayload")
            .field("routing_key", &"<redacted>")
            .field("event_action", &self.event_action)
            .field("dedup_key", &self.dedup_key)
            .field("payload", &self.payload)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// HealthCheckEntry
// ---------------------------------------------------------------------------

/// One entry of the zone's health-check listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckEntry {
    pub name: String,
    /// Upstream status string: `healthy`, `unhealthy`, `unknown`, `suspended`.
    pub status: String,
}

impl HealthCheckEntry {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_serializes_to_events_api_shape() {
        let alert = AlertPayload {
            routing_key: "rk".into(),
            event_action: AlertAction::Trigger,
            dedup_key: "scandal".into(),
            payload: IncidentDetails {
                summary: "scandal-web is Unhealthy: TCP connection failed".into(),
                source: "scandal".into(),
                severity: Severity::Critical,
                component: "web".into(),
            },
        };

        assert_eq!(
            serde_json::to_value(&alert).unwrap(),
            json!({
                "routing_key": "rk",
                "event_action": "trigger",
                "dedup_key": "scandal",
                "payload": {
                    "summary": "scandal-web is Unhealthy: TCP connection failed",
                    "source": "scandal",
                    "severity": "critical",
                    "component": "web",
                }
            })
        );
    }

    #[test]
    fn debug_output_hides_routing_key() {
        let alert = AlertPayload {
            routing_key: "super-secret".into(),
            event_action: AlertAction::Resolve,
            dedup_key: "svc".into(),
            payload: IncidentDetails {
                summary: String::new(),
                source: "svc".into(),
                severity: Severity::Info,
                component: String::new(),
            },
        };
        assert!(!format!("{alert:?}").contains("super-secret"));
    }

    #[test]
    fn entry_health_is_case_insensitive() {
        assert!(HealthCheckEntry::new("a-web", "healthy").is_healthy());
        assert!(HealthCheckEntry::new("a-web", "Healthy").is_healthy());
        assert!(!HealthCheckEntry::new("a-web", "suspended").is_healthy());
    }
}
