//! Maps a health event and the sibling cross-check to an alert.

use upstream::IncidentDetails;

use crate::models::{AlertAction, AlertPayload, HealthEvent, HealthStatus, Severity, SnapshotStatus};
use crate::namer::split_check_name;
use crate::routing::RoutingKey;

/// Pick the action and severity for an event.
///
/// Unhealthy always pages. A healthy event only resolves the incident when
/// every other check of the service is known to be healthy; otherwise it is
/// sent as an info-level trigger, which updates the open incident without
/// paging.
pub fn decide(event: &HealthEvent, snapshot: SnapshotStatus) -> (AlertAction, Severity) {
    match (event.status, snapshot) {
        (HealthStatus::Unhealthy, _) => (AlertAction::Trigger, Severity::Critical),
        (HealthStatus::Healthy, SnapshotStatus::Healthy) => (AlertAction::Resolve, Severity::Info),
        (HealthStatus::Healthy, _) => (AlertAction::Trigger, Severity::Info),
    }
}

/// Assemble the wire payload. Deterministic in its inputs.
pub fn compose_payload(
    event: &HealthEvent,
    routing_key: &RoutingKey,
    action: AlertAction,
    severity: Severity,
) -> AlertPayload {
    let name = split_check_name(&event.check_name);
    AlertPayload {
        routing_key: routing_key.expose().to_owned(),
        event_action: action,
        dedup_key: event.service_name.clone(),
        payload: IncidentDetails {
            summary: format!("{} is {}: {}", event.check_name, event.status, event.reason),
            source: event.service_name.clone(),
            severity,
            component: name.component,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ALL_SNAPSHOTS: [SnapshotStatus; 3] =
        [SnapshotStatus::Healthy, SnapshotStatus::Unhealthy, SnapshotStatus::Unknown];

    fn event(status: HealthStatus) -> HealthEvent {
        HealthEvent::new("scandal-web", status, "TCP connection failed", Utc::now())
    }

    #[test]
    fn unhealthy_always_triggers_critical() {
        for snapshot in ALL_SNAPSHOTS {
            assert_eq!(
                decide(&event(HealthStatus::Unhealthy), snapshot),
                (AlertAction::Trigger, Severity::Critical),
                "snapshot {snapshot:?}"
            );
        }
    }

    #[test]
    fn healthy_resolves_only_when_siblings_are_healthy() {
        let healthy = event(HealthStatus::Healthy);
        assert_eq!(decide(&healthy, SnapshotStatus::Healthy), (AlertAction::Resolve, Severity::Info));
        assert_eq!(decide(&healthy, SnapshotStatus::Unhealthy), (AlertAction::Trigger, Severity::Info));
        assert_eq!(decide(&healthy, SnapshotStatus::Unknown), (AlertAction::Trigger, Severity::Info));
    }

    #[test]
    fn payload_uses_service_as_dedup_key_and_source() {
        let payload = compose_payload(
            &event(HealthStatus::Unhealthy),
            &RoutingKey::new("rk"),
            AlertAction::Trigger,
            Severity::Critical,
        );

        assert_eq!(payload.routing_key, "rk");
        assert_eq!(payload.dedup_key, "scandal");
        assert_eq!(payload.payload.source, "scandal");
        assert_eq!(payload.payload.component, "web");
        assert_eq!(payload.payload.summary, "scandal-web is Unhealthy: TCP connection failed");
    }
}
