//! Upstream call error type.

use thiserror::Error;

/// Errors returned by a [`HealthCheckSource`](crate::HealthCheckSource) or
/// [`IncidentSink`](crate::IncidentSink) call.
///
/// Every variant is treated as transient by the engine; whether it is retried
/// depends only on the calling step's retry budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status or an error-flagged body.
    #[error("upstream returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
