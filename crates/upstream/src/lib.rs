//! `upstream` crate: wire types and transports for the two external services.
//!
//! The engine talks to the health-check listing through [`HealthCheckSource`]
//! and to the incident-management API through [`IncidentSink`]. Real
//! implementations live in [`cloudflare`] and [`pagerduty`]; [`mock`] holds
//! recording doubles for tests.

pub mod error;
pub mod payload;
pub mod traits;
pub mod cloudflare;
pub mod pagerduty;
pub mod mock;

pub use error::UpstreamError;
pub use payload::{AlertAction, AlertPayload, HealthCheckEntry, IncidentDetails, Severity};
pub use traits::{HealthCheckSource, IncidentSink};
