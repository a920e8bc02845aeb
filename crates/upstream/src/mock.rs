//! Test doubles for [`HealthCheckSource`] and [`IncidentSink`].
//!
//! Both record every call so tests can assert on attempt counts.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{AlertPayload, HealthCheckEntry, HealthCheckSource, IncidentSink, UpstreamError};

/// Behaviour injected into a mock at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour<T> {
    /// Succeed with the given value.
    Return(T),
    /// Fail every call.
    Fail(UpstreamError),
    /// Fail the first `n` calls, then succeed with the value.
    FailTimes(usize, UpstreamError, T),
    /// Never complete.
    Hang,
}

impl<T: Clone> MockBehaviour<T> {
    async fn answer(&self, call_no: usize) -> Result<T, UpstreamError> {
        match self {
            Self::Return(v) => Ok(v.clone()),
            Self::Fail(err) => Err(err.clone()),
            Self::FailTimes(n, err, v) => {
                if call_no <= *n {
                    Err(err.clone())
                } else {
                    Ok(v.clone())
                }
            }
            Self::Hang => std::future::pending().await,
        }
    }
}

fn api_error(message: &str) -> UpstreamError {
    UpstreamError::Api { status: 500, message: message.into() }
}

// ---------------------------------------------------------------------------
// MockHealthChecks
// ---------------------------------------------------------------------------

/// A health-check listing that returns a canned answer.
pub struct MockHealthChecks {
    pub behaviour: MockBehaviour<Vec<HealthCheckEntry>>,
    calls: Arc<Mutex<usize>>,
}

impl MockHealthChecks {
    pub fn returning(checks: Vec<HealthCheckEntry>) -> Self {
        Self::with(MockBehaviour::Return(checks))
    }

    pub fn failing(msg: &str) -> Self {
        Self::with(MockBehaviour::Fail(api_error(msg)))
    }

    pub fn hanging() -> Self {
        Self::with(MockBehaviour::Hang)
    }

    pub fn with(behaviour: MockBehaviour<Vec<HealthCheckEntry>>) -> Self {
        Self { behaviour, calls: Arc::new(Mutex::new(0)) }
    }

    /// Number of times the listing has been requested.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl HealthCheckSource for MockHealthChecks {
    async fn list_checks(&self) -> Result<Vec<HealthCheckEntry>, UpstreamError> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        self.behaviour.answer(call_no).await
    }
}

// ---------------------------------------------------------------------------
// MockIncidentSink
// ---------------------------------------------------------------------------

/// An incident backend that records every alert it is handed.
pub struct MockIncidentSink {
    pub behaviour: MockBehaviour<()>,
    /// All alerts received (in call order), including failed attempts.
    pub received: Arc<Mutex<Vec<AlertPayload>>>,
}

impl MockIncidentSink {
    pub fn accepting() -> Self {
        Self::with(MockBehaviour::Return(()))
    }

    pub fn failing(msg: &str) -> Self {
        Self::with(MockBehaviour::Fail(api_error(msg)))
    }

    /// Fail the first `n` deliveries, then accept.
    pub fn failing_times(n: usize, msg: &str) -> Self {
        Self::with(MockBehaviour::FailTimes(n, api_error(msg), ()))
    }

    pub fn hanging() -> Self {
        Self::with(MockBehaviour::Hang)
    }

    pub fn with(behaviour: MockBehaviour<()>) -> Self {
        Self { behaviour, received: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<AlertPayload> {
        self.received.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl IncidentSink for MockIncidentSink {
    async fn enqueue(&self, alert: &AlertPayload) -> Result<(), UpstreamError> {
        let call_no = {
            let mut received = self.received.lock().unwrap();
            received.push(alert.clone());
            received.len()
        };
        self.behaviour.answer(call_no).await
    }
}
