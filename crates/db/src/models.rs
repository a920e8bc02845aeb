//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models: they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// workflow_runs
// ---------------------------------------------------------------------------

/// A persisted alert workflow run.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WorkflowRunRow {
    /// Hyphenated UUID.
    pub id: String,
    /// Snake-case run state (`received`, `building`, …).
    pub state: String,
    /// JSON-encoded health event.
    pub event: String,
    pub routing_key: String,
    /// JSON-encoded alert payload, present once the build step finished.
    pub payload: Option<String>,
    pub build_attempts: i64,
    pub dispatch_attempts: i64,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
