use serde::{Deserialize, Serialize};

/// A tabular analytical model tracked by the catalog.
///
/// Holds a weak reference to its workspace (id + lookup, never ownership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub business_area: Option<String>,
    /// Unix seconds of the last successful dataset sync.
    pub last_synced: Option<i64>,
}
