//! Error types for the pipeline stages.

use std::path::PathBuf;
use tablepipe_core::ErrorKind;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while running a stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Data error: {0}")]
    Table(#[from] tablepipe_core::Error),

    #[error("Database error: {0}")]
    Database(#[from] tablepipe_db::DbError),

    #[error("Search error: {0}")]
    Search(#[from] tablepipe_search::SearchError),

    #[error("Config error: {0}")]
    Config(#[from] tablepipe_config::ConfigError),

    #[error("Expected column '{column}' is missing")]
    MissingColumn { column: String },
}

impl PipelineError {
    /// Classify the error for the run history.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Io(_) | PipelineError::FileNotFound(_) => ErrorKind::Io,
            PipelineError::Table(tablepipe_core::Error::Io(_)) => ErrorKind::Io,
            PipelineError::Table(_) => ErrorKind::DataFormat,
            PipelineError::Database(e) if e.is_connection() => ErrorKind::Connection,
            PipelineError::Database(_) => ErrorKind::DataFormat,
            PipelineError::Search(e) if e.is_connection() => ErrorKind::Connection,
            PipelineError::Search(_) => ErrorKind::DataFormat,
            PipelineError::Config(_) | PipelineError::MissingColumn { .. } => ErrorKind::DataFormat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let missing = PipelineError::FileNotFound(PathBuf::from("data_raw.csv"));
        assert_eq!(missing.kind(), ErrorKind::Io);

        let ragged = PipelineError::Table(tablepipe_core::Error::RaggedRow {
            row: 3,
            expected: 4,
            found: 2,
        });
        assert_eq!(ragged.kind(), ErrorKind::DataFormat);

        let no_table = PipelineError::Database(tablepipe_db::DbError::TableNotFound("t".into()));
        assert_eq!(no_table.kind(), ErrorKind::DataFormat);

        let down = PipelineError::Search(tablepipe_search::SearchError::Unreachable {
            endpoint: "http://localhost:9200".into(),
        });
        assert_eq!(down.kind(), ErrorKind::Connection);

        let schema = PipelineError::Database(tablepipe_db::DbError::Sqlite(
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some("duplicate column name: price".into()),
            ),
        ));
        assert_eq!(schema.kind(), ErrorKind::DataFormat);

        let busy = PipelineError::Database(tablepipe_db::DbError::Sqlite(
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(5), None),
        ));
        assert_eq!(busy.kind(), ErrorKind::Connection);

        let junk = PipelineError::MissingColumn {
            column: "unnamed_12".into(),
        };
        assert_eq!(junk.kind(), ErrorKind::DataFormat);
    }
}
