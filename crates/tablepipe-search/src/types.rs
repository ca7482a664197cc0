//! Types for search API requests and responses.

use serde::{Deserialize, Serialize};

/// Response from the root endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: Option<VersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

/// Response from `PUT /<index>/_doc/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    /// `created` or `updated`.
    pub result: String,
}

impl IndexResponse {
    pub fn was_created(&self) -> bool {
        self.result == "created"
    }
}

/// Response from `_delete_by_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteByQueryResponse {
    #[serde(default)]
    pub deleted: u64,
}

/// Response from `_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Body of `_delete_by_query` selecting documents above a numeric bound.
pub fn range_above_query(field: &str, above: i64) -> serde_json::Value {
    serde_json::json!({
        "query": {
            "range": {
                field: { "gt": above }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_response() {
        let body = r#"{"_index":"table_milestone","_id":"3","_version":2,"result":"updated",
            "_shards":{"total":2,"successful":1,"failed":0},"_seq_no":7,"_primary_term":1}"#;
        let response: IndexResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.id, "3");
        assert_eq!(response.version, Some(2));
        assert!(!response.was_created());
    }

    #[test]
    fn test_range_query_shape() {
        let query = range_above_query("id", 8);
        assert_eq!(query["query"]["range"]["id"]["gt"], 8);
    }
}
