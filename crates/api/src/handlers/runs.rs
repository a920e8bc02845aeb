use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use engine::WorkflowRun;
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

/// Operator view of a run. The routing key is never exposed.
#[derive(Debug, Serialize)]
pub struct RunView {
    pub id: Uuid,
    pub state: String,
    pub check_name: String,
    pub status: String,
    pub build_attempts: u32,
    pub dispatch_attempts: u32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub event_action: Option<String>,
    pub severity: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkflowRun> for RunView {
    fn from(run: WorkflowRun) -> Self {
        let payload = run.payload.as_ref();
        Self {
            id: run.id,
            state: run.state.to_string(),
            check_name: run.event.check_name.clone(),
            status: run.event.status.to_string(),
            build_attempts: run.build_attempts,
            dispatch_attempts: run.dispatch_attempts,
            next_attempt_at: run.next_attempt_at,
            event_action: payload.map(|p| p.event_action.to_string()),
            severity: payload.map(|p| p.payload.severity.to_string()),
            summary: payload.map(|p| p.payload.summary.clone()),
            last_error: run.last_error,
            created_at: run.created_at,
            updated_at: run.updated_at,
        }
    }
}

/// `GET /runs/{id}`
pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<RunView>, ApiError> {
    let run = state.workflow.store().load(id).await?;
    Ok(Json(RunView::from(run)))
}
