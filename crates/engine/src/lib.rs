//! `engine` crate: the alerting core.
//!
//! Turns an admitted health-check notification into an incident alert:
//! naming, sibling cross-check, trigger/resolve decision, and the durable
//! two-step workflow that builds and dispatches the alert.

pub mod models;
pub mod error;
pub mod routing;
pub mod namer;
pub mod decision;
pub mod retry;
pub mod checker;
pub mod dispatcher;
pub mod intake;
pub mod store;
pub mod executor;

pub use models::{
    AlertAction, AlertPayload, HealthEvent, HealthStatus, RunState, Severity, SnapshotStatus, Step,
    WorkflowRun,
};
pub use error::{DispatchError, EngineError};
pub use routing::{RoutingKey, RoutingTable};
pub use namer::{split_check_name, CheckName};
pub use decision::decide;
pub use retry::{Backoff, RetryPolicy};
pub use checker::HealthSnapshotChecker;
pub use dispatcher::AlertDispatcher;
pub use intake::{admit, Admission, Notification};
pub use store::{MemoryRunStore, RunStore, SqlRunStore};
pub use executor::{AlertWorkflow, WorkflowConfig};
