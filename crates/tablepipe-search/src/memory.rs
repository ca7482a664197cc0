//! In-process document index.

use crate::error::{SearchError, SearchResult};
use crate::index::{Document, DocumentIndex};
use crate::types::IndexResponse;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// Documents held in memory, keyed by index then document id.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    indices: Mutex<HashMap<String, BTreeMap<u64, Document>>>,
    rejected: HashSet<u64>,
    offline: bool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index whose `ping` fails as if the endpoint were down.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Reject indexing of the given document ids with an API error.
    pub fn rejecting(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            rejected: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Snapshot of one index, ordered by id.
    pub fn documents(&self, index: &str) -> Vec<(u64, Document)> {
        let indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        indices
            .get(index)
            .map(|docs| docs.iter().map(|(id, doc)| (*id, doc.clone())).collect())
            .unwrap_or_default()
    }

    fn check_online(&self) -> SearchResult<()> {
        if self.offline {
            return Err(SearchError::Unreachable {
                endpoint: "memory".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    async fn ping(&self) -> SearchResult<()> {
        self.check_online()
    }

    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &Document,
    ) -> SearchResult<IndexResponse> {
        self.check_online()?;
        if self.rejected.contains(&id) {
            return Err(SearchError::ApiError {
                status: 400,
                message: format!("document {} rejected", id),
            });
        }

        let mut indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        let previous = indices
            .entry(index.to_string())
            .or_default()
            .insert(id, document.clone());

        Ok(IndexResponse {
            index: index.to_string(),
            id: id.to_string(),
            version: None,
            result: if previous.is_some() { "updated" } else { "created" }.to_string(),
        })
    }

    async fn delete_above(&self, index: &str, field: &str, above: i64) -> SearchResult<u64> {
        self.check_online()?;
        let mut indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = indices.get_mut(index) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|_, doc| {
            doc.get(field)
                .and_then(|v| v.as_i64())
                .map(|v| v <= above)
                .unwrap_or(true)
        });
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, index: &str) -> SearchResult<u64> {
        self.check_online()?;
        let indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        indices
            .get(index)
            .map(|docs| docs.len() as u64)
            .ok_or_else(|| SearchError::IndexNotFound {
                index: index.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: i64) -> Document {
        json!({ "id": id, "name": "row" }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_index_overwrites_by_id() {
        let index = MemoryIndex::new();

        let first = index.index_document("t", 1, &doc(1)).await.unwrap();
        let second = index.index_document("t", 1, &doc(1)).await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(index.count("t").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_above() {
        let index = MemoryIndex::new();
        for id in 1..=5 {
            index.index_document("t", id, &doc(id as i64)).await.unwrap();
        }

        assert_eq!(index.delete_above("t", "id", 3).await.unwrap(), 2);
        let ids: Vec<u64> = index.documents("t").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_offline_and_rejecting() {
        assert!(MemoryIndex::offline().ping().await.unwrap_err().is_connection());

        let index = MemoryIndex::rejecting([2]);
        assert!(index.index_document("t", 1, &doc(1)).await.is_ok());
        assert!(index.index_document("t", 2, &doc(2)).await.is_err());
        assert!(matches!(
            index.count("missing").await,
            Err(SearchError::IndexNotFound { .. })
        ));
    }
}
