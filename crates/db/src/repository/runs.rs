//! Workflow run repository functions.

use crate::{models::WorkflowRunRow, DbError, DbPool};

const COLUMNS: &str = "id, state, event, routing_key, payload, build_attempts, \
    dispatch_attempts, next_attempt_at, last_error, created_at, updated_at";

/// Insert a freshly created run.
pub async fn insert_run(pool: &DbPool, row: &WorkflowRunRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO workflow_runs
            (id, state, event, routing_key, payload, build_attempts,
             dispatch_attempts, next_attempt_at, last_error, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.state)
    .bind(&row.event)
    .bind(&row.routing_key)
    .bind(&row.payload)
    .bind(row.build_attempts)
    .bind(row.dispatch_attempts)
    .bind(row.next_attempt_at)
    .bind(&row.last_error)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable columns of an existing run.
///
/// Returns `DbError::NotFound` if no row was updated.
pub async fn update_run(pool: &DbPool, row: &WorkflowRunRow) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_runs
        SET state = ?, payload = ?, build_attempts = ?, dispatch_attempts = ?,
            next_attempt_at = ?, last_error = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&row.state)
    .bind(&row.payload)
    .bind(row.build_attempts)
    .bind(row.dispatch_attempts)
    .bind(row.next_attempt_at)
    .bind(&row.last_error)
    .bind(row.updated_at)
    .bind(&row.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Fetch a single run by its primary key.
pub async fn get_run(pool: &DbPool, id: &str) -> Result<WorkflowRunRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRunRow>(&format!(
        "SELECT {COLUMNS} FROM workflow_runs WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return every run not yet in a terminal state, oldest first.
pub async fn list_unfinished_runs(pool: &DbPool) -> Result<Vec<WorkflowRunRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowRunRow>(&format!(
        "SELECT {COLUMNS} FROM workflow_runs \
         WHERE state NOT IN ('completed', 'failed') ORDER BY created_at ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
