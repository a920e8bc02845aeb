//! Errors surfaced by the persistence layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// No row matched the given id (select or update).
    #[error("row not found")]
    NotFound,

    /// A stored row could not be converted to or from its domain value.
    #[error("row {id} is corrupt: {reason}")]
    CorruptRow { id: String, reason: String },

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn corrupt(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptRow { id: id.into(), reason: reason.to_string() }
    }
}
