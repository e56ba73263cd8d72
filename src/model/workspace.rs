use serde::{Deserialize, Serialize};

/// A container grouping related datasets in the external platform.
///
/// The id is the platform's GUID, not a locally assigned key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Unix seconds of the last successful workspace sync.
    pub last_synced: Option<i64>,
}
