//! Search index HTTP client.

use crate::error::{SearchError, SearchResult};
use crate::index::{Document, DocumentIndex};
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tablepipe_config::SearchConfig;
use tracing::{debug, info};

/// Client for an Elasticsearch-compatible search endpoint.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl SearchClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        Self::with_timeout(&config.endpoint, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a new client with default settings.
    pub fn new(endpoint: impl Into<String>) -> SearchResult<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> SearchResult<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SearchError::InvalidConfig(format!(
                "endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SearchError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> SearchError {
        if e.is_connect() {
            SearchError::Unreachable {
                endpoint: self.endpoint.clone(),
            }
        } else if e.is_timeout() {
            SearchError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            SearchError::Http(e)
        }
    }

    /// Turn a non-success status into an error, naming `index` on 404.
    async fn check_status(response: Response, index: Option<&str>) -> SearchResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 && text.contains("index_not_found_exception") {
            if let Some(index) = index {
                return Err(SearchError::IndexNotFound {
                    index: index.to_string(),
                });
            }
        }

        Err(SearchError::ApiError {
            status: status.as_u16(),
            message: text,
        })
    }

    /// Fetch cluster name and version from the root endpoint.
    pub async fn info(&self) -> SearchResult<ClusterInfo> {
        debug!("Fetching cluster info from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check_status(response, None).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentIndex for SearchClient {
    async fn ping(&self) -> SearchResult<()> {
        let info = self.info().await?;
        info!(
            "Connected to search cluster {} ({})",
            info.cluster_name,
            info.version.map(|v| v.number).unwrap_or_default()
        );
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &Document,
    ) -> SearchResult<IndexResponse> {
        let url = self.url(&format!("{}/_doc/{}", index, id));
        debug!("Indexing document {} into {}", id, index);

        let response = self
            .client
            .put(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check_status(response, Some(index)).await?;

        let indexed: IndexResponse = response.json().await?;
        debug!("Response from search index: {:?}", indexed);
        Ok(indexed)
    }

    async fn delete_above(&self, index: &str, field: &str, above: i64) -> SearchResult<u64> {
        let url = self.url(&format!(
            "{}/_delete_by_query?conflicts=proceed&refresh=true",
            index
        ));
        debug!("Deleting documents in {} with {} > {}", index, field, above);

        let response = self
            .client
            .post(&url)
            .json(&range_above_query(field, above))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check_status(response, Some(index)).await?;

        let deleted: DeleteByQueryResponse = response.json().await?;
        info!("Deleted {} stale documents from {}", deleted.deleted, index);
        Ok(deleted.deleted)
    }

    async fn count(&self, index: &str) -> SearchResult<u64> {
        let url = self.url(&format!("{}/_count", index));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check_status(response, Some(index)).await?;

        let count: CountResponse = response.json().await?;
        Ok(count.count)
    }
}
