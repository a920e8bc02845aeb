//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::Step;

/// Errors produced by the engine (intake + execution + persistence).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Rejected input: no run is created ------

    /// The notification is not a health-check status notification.
    #[error("unsupported alert type '{0}'")]
    UnsupportedAlertType(String),

    /// The notification has no `data` section.
    #[error("notification carries no health-check data")]
    MissingData,

    /// No routing key is configured for the service.
    #[error("service {0} not found")]
    UnknownService(String),

    // ------ Execution errors ------

    /// A step used up its attempt budget.
    #[error("step '{step}' failed after {attempts} attempt(s): {message}")]
    StepExhausted {
        step: Step,
        attempts: u32,
        message: String,
    },

    /// A step ran past its overall timeout.
    #[error("step '{step}' timed out after {attempts} attempt(s)")]
    StepTimedOut { step: Step, attempts: u32 },

    // ------ Persistence errors ------

    #[error("workflow run {0} not found")]
    RunNotFound(Uuid),

    /// Persistence error from the db crate, including rows that no longer
    /// decode into a [`WorkflowRun`](crate::WorkflowRun).
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

impl EngineError {
    /// True when a step used up its retry budget or time. Only these end a
    /// run as failed; anything else leaves it for a later resume.
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::StepExhausted { .. } | Self::StepTimedOut { .. })
    }

    /// True for errors that reject a notification before any run exists.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedAlertType(_) | Self::MissingData | Self::UnknownService(_)
        )
    }
}

/// A failed delivery to the incident backend.
#[derive(Debug, Error)]
#[error("incident dispatch failed: {0}")]
pub struct DispatchError(#[from] pub upstream::UpstreamError);
