//! The seam between the publish stage and a concrete index.

use crate::error::SearchResult;
use crate::types::IndexResponse;
use async_trait::async_trait;

/// A flat key-value document.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Fail unless the index backend is reachable.
    async fn ping(&self) -> SearchResult<()>;

    /// Create or overwrite the document stored under `id`.
    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &Document,
    ) -> SearchResult<IndexResponse>;

    /// Delete documents whose numeric `field` is greater than `above`.
    /// Returns the number of deleted documents.
    async fn delete_above(&self, index: &str, field: &str, above: i64) -> SearchResult<u64>;

    /// Number of documents in `index`.
    async fn count(&self, index: &str) -> SearchResult<u64>;
}
