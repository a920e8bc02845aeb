//! `db` crate: pure persistence layer.
//!
//! Provides a SQLite connection pool, the `workflow_runs` row struct, and the
//! repository functions the engine's SQL run store is built on. No business
//! logic lives here.

pub mod error;
pub mod pool;
pub mod repository;
pub mod models;

pub use pool::DbPool;
pub use error::DbError;
