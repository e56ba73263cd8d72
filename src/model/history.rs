use serde::{Deserialize, Serialize};

/// A recorded query attempt against a dataset.
///
/// Immutable once written, except the feedback fields, which may be attached
/// later via the journal. `led_to_query_id` is an index-based back-reference
/// to a strictly older entry, so chains are forward-only and never cyclic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub id: i64,
    pub dataset_id: String,
    pub session_id: Option<String>,
    pub user_identifier: Option<String>,
    pub question: String,
    pub generated_query: Option<String>,
    pub query_type: String,
    pub execution_time_ms: Option<i64>,
    pub row_count: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub result_summary: Option<serde_json::Value>,
    pub insights: Option<serde_json::Value>,
    pub recommendations: Option<serde_json::Value>,
    pub confidence_score: Option<f64>,
    pub measures_used: Vec<String>,
    pub tables_used: Vec<String>,
    /// 1-5 user rating, attached after the fact.
    pub user_rating: Option<i64>,
    pub user_feedback: Option<String>,
    pub was_helpful: Option<bool>,
    pub led_to_query_id: Option<i64>,
    /// Unix seconds, assigned by the journal at record time.
    pub created_at: i64,
}

/// Input for recording a query attempt. Id and creation time are assigned by
/// the journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewQueryEntry {
    pub dataset_id: String,
    pub session_id: Option<String>,
    pub user_identifier: Option<String>,
    pub question: String,
    pub generated_query: Option<String>,
    pub query_type: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub row_count: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub result_summary: Option<serde_json::Value>,
    pub insights: Option<serde_json::Value>,
    pub recommendations: Option<serde_json::Value>,
    pub confidence_score: Option<f64>,
    pub measures_used: Vec<String>,
    pub tables_used: Vec<String>,
    pub led_to_query_id: Option<i64>,
}

/// User feedback attached to an already-recorded entry. Only present fields
/// are updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFeedback {
    pub user_rating: Option<i64>,
    pub user_feedback: Option<String>,
    pub was_helpful: Option<bool>,
}
