//! Core domain models for the alerting workflow.
//!
//! A [`WorkflowRun`] is the unit of durability: it is written to the run
//! store after every state change and every failed attempt, so a restarted
//! process can pick it up where it stopped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use upstream::{AlertAction, AlertPayload, Severity};

use crate::namer::split_check_name;
use crate::routing::RoutingKey;

// ---------------------------------------------------------------------------
// HealthStatus / HealthEvent
// ---------------------------------------------------------------------------

/// Status carried by a health-check notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Anything other than the exact string `Healthy` counts as unhealthy.
    pub fn from_notification(status: &str) -> Self {
        if status == "Healthy" {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// One inbound health-check notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub service_name: String,
    /// Full `service-component` identifier of the check that reported.
    pub check_name: String,
    pub status: HealthStatus,
    pub reason: String,
    pub observed_at: DateTime<Utc>,
}

impl HealthEvent {
    pub fn new(
        check_name: impl Into<String>,
        status: HealthStatus,
        reason: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let check_name = check_name.into();
        let service_name = split_check_name(&check_name).service;
        Self {
            service_name,
            check_name,
            status,
            reason: reason.into(),
            observed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotStatus
// ---------------------------------------------------------------------------

/// Result of the sibling cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotStatus {
    Healthy,
    Unhealthy,
    /// The cross-check was skipped or failed. Never resolves an incident.
    Unknown,
}

// ---------------------------------------------------------------------------
// RunState / Step
// ---------------------------------------------------------------------------

/// Lifecycle of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Received,
    Building,
    Built,
    Dispatching,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Building => "building",
            Self::Built => "built",
            Self::Dispatching => "dispatching",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received"    => Ok(Self::Received),
            "building"    => Ok(Self::Building),
            "built"       => Ok(Self::Built),
            "dispatching" => Ok(Self::Dispatching),
            "completed"   => Ok(Self::Completed),
            "failed"      => Ok(Self::Failed),
            other         => Err(format!("unknown run state: {other}")),
        }
    }
}

/// The two retryable steps of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Build,
    Dispatch,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Dispatch => write!(f, "dispatch"),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowRun
// ---------------------------------------------------------------------------

/// Persistent record of one alert workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub state: RunState,
    pub event: HealthEvent,
    pub routing_key: RoutingKey,
    /// Set once the build step succeeds; never recomputed afterwards.
    pub payload: Option<AlertPayload>,
    pub build_attempts: u32,
    pub dispatch_attempts: u32,
    /// When the next attempt of the current step is due, while backing off.
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(event: HealthEvent, routing_key: RoutingKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: RunState::Received,
            event,
            routing_key,
            payload: None,
            build_attempts: 0,
            dispatch_attempts: 0,
            next_attempt_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attempts(&self, step: Step) -> u32 {
        match step {
            Step::Build => self.build_attempts,
            Step::Dispatch => self.dispatch_attempts,
        }
    }

    pub(crate) fn record_attempt(&mut self, step: Step) -> u32 {
        let counter = match step {
            Step::Build => &mut self.build_attempts,
            Step::Dispatch => &mut self.dispatch_attempts,
        };
        *counter += 1;
        *counter
    }

    pub(crate) fn transition(&mut self, state: RunState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
