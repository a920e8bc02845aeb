//! Durable storage of workflow runs.
//!
//! The workflow writes through [`RunStore`] after every state change and
//! every failed attempt. [`SqlRunStore`] is the production backend;
//! [`MemoryRunStore`] serves tests and store-less deployments.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use db::{models::WorkflowRunRow, repository::runs as run_repo, DbError, DbPool};
use uuid::Uuid;

use crate::models::{RunState, WorkflowRun};
use crate::routing::RoutingKey;
use crate::EngineError;

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a new run.
    async fn create(&self, run: &WorkflowRun) -> Result<(), EngineError>;
    /// Overwrite an existing run.
    async fn save(&self, run: &WorkflowRun) -> Result<(), EngineError>;
    async fn load(&self, id: Uuid) -> Result<WorkflowRun, EngineError>;
    /// Runs that are neither completed nor failed, oldest first.
    async fn unfinished(&self) -> Result<Vec<WorkflowRun>, EngineError>;
}

// ---------------------------------------------------------------------------
// MemoryRunStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<Uuid, WorkflowRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write replaces a whole run, so a guard poisoned by a panicking
    /// holder still protects consistent records.
    fn runs(&self) -> MutexGuard<'_, HashMap<Uuid, WorkflowRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, run: &WorkflowRun) -> Result<(), EngineError> {
        self.runs().insert(run.id, run.clone());
        Ok(())
    }

    async fn save(&self, run: &WorkflowRun) -> Result<(), EngineError> {
        match self.runs().get_mut(&run.id) {
            Some(slot) => {
                *slot = run.clone();
                Ok(())
            }
            None => Err(EngineError::RunNotFound(run.id)),
        }
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowRun, EngineError> {
        self.runs()
            .get(&id)
            .cloned()
            .ok_or(EngineError::RunNotFound(id))
    }

    async fn unfinished(&self) -> Result<Vec<WorkflowRun>, EngineError> {
        let mut runs: Vec<WorkflowRun> = self
            .runs()
            .values()
            .filter(|r| !r.state.is_terminal())
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.created_at);
        Ok(runs)
    }
}

// ---------------------------------------------------------------------------
// SqlRunStore
// ---------------------------------------------------------------------------

/// [`RunStore`] over the `workflow_runs` table.
pub struct SqlRunStore {
    pool: DbPool,
}

impl SqlRunStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for SqlRunStore {
    async fn create(&self, run: &WorkflowRun) -> Result<(), EngineError> {
        run_repo::insert_run(&self.pool, &to_row(run)?).await?;
        Ok(())
    }

    async fn save(&self, run: &WorkflowRun) -> Result<(), EngineError> {
        match run_repo::update_run(&self.pool, &to_row(run)?).await {
            Err(DbError::NotFound) => Err(EngineError::RunNotFound(run.id)),
            other => Ok(other?),
        }
    }

    async fn load(&self, id: Uuid) -> Result<WorkflowRun, EngineError> {
        match run_repo::get_run(&self.pool, &id.to_string()).await {
            Ok(row) => from_row(row),
            Err(DbError::NotFound) => Err(EngineError::RunNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn unfinished(&self) -> Result<Vec<WorkflowRun>, EngineError> {
        run_repo::list_unfinished_runs(&self.pool)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

fn to_row(run: &WorkflowRun) -> Result<WorkflowRunRow, EngineError> {
    let corrupt = |e: serde_json::Error| EngineError::from(DbError::corrupt(run.id.to_string(), e));

    Ok(WorkflowRunRow {
        id: run.id.to_string(),
        state: run.state.as_str().to_owned(),
        event: serde_json::to_string(&run.event).map_err(corrupt)?,
        routing_key: run.routing_key.expose().to_owned(),
        payload: run
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(corrupt)?,
        build_attempts: i64::from(run.build_attempts),
        dispatch_attempts: i64::from(run.dispatch_attempts),
        next_attempt_at: run.next_attempt_at,
        last_error: run.last_error.clone(),
        created_at: run.created_at,
        updated_at: run.updated_at,
    })
}

fn from_row(row: WorkflowRunRow) -> Result<WorkflowRun, EngineError> {
    let corrupt = |reason: String| EngineError::from(DbError::corrupt(row.id.clone(), reason));

    let id = Uuid::parse_str(&row.id).map_err(|e| corrupt(e.to_string()))?;
    let state: RunState = row.state.parse().map_err(corrupt)?;
    let event = serde_json::from_str(&row.event).map_err(|e| corrupt(e.to_string()))?;
    let payload = row
        .payload
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| corrupt(e.to_string()))?;
    let build_attempts = u32::try_from(row.build_attempts).map_err(|e| corrupt(e.to_string()))?;
    let dispatch_attempts =
        u32::try_from(row.dispatch_attempts).map_err(|e| corrupt(e.to_string()))?;

    Ok(WorkflowRun {
        id,
        state,
        event,
        routing_key: RoutingKey::new(row.routing_key),
        payload,
        build_attempts,
        dispatch_attempts,
        next_attempt_at: row.next_attempt_at,
        last_error: row.last_error,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
