//! Sibling cross-check: are the service's other health checks healthy?
//!
//! The answer only ever gates a resolve, so every failure mode collapses into
//! [`SnapshotStatus::Unknown`] instead of an error.

use std::sync::Arc;

use tracing::{debug, info, warn};
use upstream::{HealthCheckEntry, HealthCheckSource};

use crate::models::SnapshotStatus;
use crate::namer::split_check_name;
use crate::retry::{retry, RetryError, RetryPolicy};

pub struct HealthSnapshotChecker {
    source: Option<Arc<dyn HealthCheckSource>>,
    policy: RetryPolicy,
}

impl HealthSnapshotChecker {
    pub fn new(source: Arc<dyn HealthCheckSource>, policy: RetryPolicy) -> Self {
        Self { source: Some(source), policy }
    }

    /// A checker without zone credentials; always answers `Unknown`.
    pub fn disabled() -> Self {
        Self { source: None, policy: RetryPolicy::cross_check() }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Check every health check of `service` except `exclude_check`.
    ///
    /// The reporting check is excluded because the listing may not reflect
    /// its new status yet.
    pub async fn all_others_healthy(&self, service: &str, exclude_check: &str) -> SnapshotStatus {
        let Some(source) = &self.source else {
            debug!("cross-check not configured, snapshot unknown");
            return SnapshotStatus::Unknown;
        };

        let listing = retry("health-check listing", &self.policy, |_| source.list_checks()).await;

        match listing {
            Ok(checks) => evaluate(&checks, service, exclude_check),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!("cross-check for '{}' gave up after {} attempt(s): {}", service, attempts, last);
                SnapshotStatus::Unknown
            }
            Err(RetryError::TimedOut { attempts }) => {
                warn!(
                    "cross-check for '{}' timed out after {:?} ({} attempt(s))",
                    service, self.policy.timeout, attempts
                );
                SnapshotStatus::Unknown
            }
        }
    }
}

/// Pure part of the cross-check over an already fetched listing.
pub fn evaluate(checks: &[HealthCheckEntry], service: &str, exclude_check: &str) -> SnapshotStatus {
    let sick = checks
        .iter()
        .filter(|c| c.name != exclude_check)
        .filter(|c| split_check_name(&c.name).service == service)
        .find(|c| !c.is_healthy());

    match sick {
        Some(check) => {
            info!("{} is not healthy ({})", check.name, check.status);
            SnapshotStatus::Unhealthy
        }
        None => SnapshotStatus::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use upstream::mock::MockHealthChecks;

    use crate::retry::Backoff;

    fn entry(name: &str, status: &str) -> HealthCheckEntry {
        HealthCheckEntry::new(name, status)
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
            backoff: Backoff::Linear,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn reporting_check_is_ignored() {
        let checks = vec![entry("svc-web", "unhealthy")];
        assert_eq!(evaluate(&checks, "svc", "svc-web"), SnapshotStatus::Healthy);
    }

    #[test]
    fn other_services_are_ignored() {
        let checks = vec![entry("svc-web", "healthy"), entry("other-web", "unhealthy")];
        assert_eq!(evaluate(&checks, "svc", "svc-web"), SnapshotStatus::Healthy);
    }

    #[test]
    fn unhealthy_sibling_blocks_resolve() {
        let checks = vec![
            entry("svc-web", "healthy"),
            entry("svc-smtp", "unhealthy"),
            entry("svc-api", "healthy"),
        ];
        assert_eq!(evaluate(&checks, "svc", "svc-web"), SnapshotStatus::Unhealthy);
    }

    #[test]
    fn unknown_or_suspended_siblings_are_not_healthy() {
        assert_eq!(
            evaluate(&[entry("svc-smtp", "unknown")], "svc", "svc-web"),
            SnapshotStatus::Unhealthy
        );
        assert_eq!(
            evaluate(&[entry("svc-smtp", "suspended")], "svc", "svc-web"),
            SnapshotStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn disabled_checker_is_unknown() {
        let checker = HealthSnapshotChecker::disabled();
        assert!(!checker.is_enabled());
        assert_eq!(checker.all_others_healthy("svc", "svc-web").await, SnapshotStatus::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listing_degrades_to_unknown_after_retries() {
        let source = Arc::new(MockHealthChecks::failing("zone not found"));
        let checker = HealthSnapshotChecker::new(source.clone(), quick_policy());

        assert_eq!(checker.all_others_healthy("svc", "svc-web").await, SnapshotStatus::Unknown);
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_listing_degrades_to_unknown_on_timeout() {
        let source = Arc::new(MockHealthChecks::hanging());
        let checker = HealthSnapshotChecker::new(source.clone(), quick_policy());

        assert_eq!(checker.all_others_healthy("svc", "svc-web").await, SnapshotStatus::Unknown);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn healthy_listing_is_healthy() {
        let source = Arc::new(MockHealthChecks::returning(vec![
            entry("svc-web", "unhealthy"),
            entry("svc-smtp", "healthy"),
        ]));
        let checker = HealthSnapshotChecker::new(source, quick_policy());

        assert_eq!(checker.all_others_healthy("svc", "svc-web").await, SnapshotStatus::Healthy);
    }
}
