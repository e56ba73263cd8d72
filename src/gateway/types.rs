//! Wire types for the external platform API.

use serde::{Deserialize, Serialize};

/// A workspace as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A dataset as reported by the workspace listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "configuredBy")]
    pub configured_by: Option<String>,
}

/// The most recent refresh of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshInfo {
    /// ISO-8601 end time as reported by the platform.
    pub end_time: Option<String>,
    pub status: Option<String>,
}

/// Raw row sets from schema discovery. Rows are JSON objects whose keys the
/// sync engine maps into catalog records; the gateway does no mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRows {
    pub tables: Vec<serde_json::Value>,
    pub measures: Vec<serde_json::Value>,
    /// Optional third row set; empty when the source exposes no
    /// relationship introspection.
    #[serde(default)]
    pub relationships: Vec<serde_json::Value>,
}

impl SchemaRows {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.measures.is_empty()
    }
}

// ----- Response envelopes -----

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshRecord {
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default = "Vec::new")]
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResult {
    #[serde(default = "Vec::new")]
    pub tables: Vec<QueryTable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryTable {
    #[serde(default = "Vec::new")]
    pub rows: Vec<serde_json::Value>,
}
