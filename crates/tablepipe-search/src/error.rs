//! Error types for search index operations.

use thiserror::Error;

/// Errors that can occur when talking to the search index.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The endpoint did not accept a connection.
    #[error("Search endpoint is not reachable at {endpoint}")]
    Unreachable { endpoint: String },

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The target index does not exist.
    #[error("Index not found: {index}")]
    IndexNotFound { index: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    /// Whether the endpoint itself could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            SearchError::Unreachable { .. } | SearchError::Timeout { .. }
        )
    }
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
