//! Tablepipe DB - SQLite storage for the pipeline's table and run history.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::stats::TableStats;
