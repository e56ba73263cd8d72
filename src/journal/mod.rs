//! Query journal.
//!
//! Append-only recording of query attempts, after-the-fact user feedback,
//! windowed usage analytics, and popular-question ranking. Entries are
//! immutable once written except for their feedback fields.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::model::{NewQueryEntry, QueryFeedback, QueryHistoryEntry};
use crate::store::{now_epoch, CatalogStore, HistoryFilter, StoreError, StoreResult};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
}

pub type JournalResult<T> = Result<T, JournalError>;

/// Usage analytics over a trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalytics {
    pub window_days: u32,
    pub total_queries: usize,
    pub successful_queries: usize,
    pub success_rate: f64,
    pub queries_by_dataset: Vec<DatasetQueryCount>,
    /// Most-used measure names, busiest first. Ties keep the order in which
    /// the measures first appeared in the window.
    pub top_measures: Vec<MeasureUsage>,
    pub query_types: BTreeMap<String, usize>,
    pub average_execution_time_ms: Option<f64>,
    pub average_rating: Option<f64>,
    pub rated_queries: usize,
    pub helpful_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetQueryCount {
    pub dataset_id: String,
    pub dataset_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasureUsage {
    pub name: String,
    pub count: usize,
}

/// A question that has worked well before.
#[derive(Debug, Clone, Serialize)]
pub struct PopularQuestion {
    pub question: String,
    pub generated_query: Option<String>,
    pub user_rating: Option<i64>,
    pub created_at: i64,
}

/// Record a query attempt. Returns the assigned entry id.
///
/// A `led_to_query_id` that does not reference an already-recorded entry is
/// dropped rather than rejected, so a lost parent never blocks journaling.
pub fn record(store: &CatalogStore, new: NewQueryEntry) -> JournalResult<i64> {
    let led_to = match new.led_to_query_id {
        Some(id) => {
            if store.get_query(id)?.is_some() {
                Some(id)
            } else {
                debug!(led_to = id, "dropping back-reference to unknown entry");
                None
            }
        }
        None => None,
    };

    let entry = QueryHistoryEntry {
        id: 0,
        dataset_id: new.dataset_id,
        session_id: new.session_id,
        user_identifier: new.user_identifier,
        question: new.question,
        generated_query: new.generated_query,
        query_type: new.query_type.unwrap_or_else(|| "analysis".to_string()),
        execution_time_ms: new.execution_time_ms,
        row_count: new.row_count,
        success: new.success,
        error_message: new.error_message,
        result_summary: new.result_summary,
        insights: new.insights,
        recommendations: new.recommendations,
        confidence_score: new.confidence_score,
        measures_used: new.measures_used,
        tables_used: new.tables_used,
        user_rating: None,
        user_feedback: None,
        was_helpful: None,
        led_to_query_id: led_to,
        created_at: now_epoch(),
    };
    Ok(store.insert_query(&entry)?)
}

/// Attach feedback to an entry. Returns false when the entry does not exist.
pub fn update_feedback(
    store: &CatalogStore,
    id: i64,
    feedback: &QueryFeedback,
) -> JournalResult<bool> {
    if let Some(rating) = feedback.user_rating {
        if !(1..=5).contains(&rating) {
            return Err(JournalError::InvalidRating(rating));
        }
    }
    Ok(store.update_feedback(id, feedback)?)
}

/// Filtered history read, most recent first.
pub fn list_history(
    store: &CatalogStore,
    filter: &HistoryFilter,
) -> StoreResult<Vec<QueryHistoryEntry>> {
    store.query_history(filter)
}

/// Compute analytics over the trailing window, optionally scoped to one
/// dataset.
pub fn compute_analytics(
    store: &CatalogStore,
    dataset_id: Option<&str>,
    window_days: u32,
) -> JournalResult<QueryAnalytics> {
    let since = now_epoch() - i64::from(window_days) * 86_400;
    let entries = store.queries_since(since, dataset_id)?;

    let total = entries.len();
    let successful = entries.iter().filter(|e| e.success).count();

    // Counting in first-seen order keeps tie ranking stable.
    let mut measure_order: Vec<String> = Vec::new();
    let mut measure_counts: HashMap<String, usize> = HashMap::new();
    let mut query_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut rating_sum = 0i64;
    let mut rated = 0usize;
    let mut helpful = 0usize;
    for entry in &entries {
        for m in &entry.measures_used {
            if !measure_counts.contains_key(m) {
                measure_order.push(m.clone());
            }
            *measure_counts.entry(m.clone()).or_insert(0) += 1;
        }
        *query_types.entry(entry.query_type.clone()).or_insert(0) += 1;
        if let Some(r) = entry.user_rating {
            rating_sum += r;
            rated += 1;
        }
        if entry.was_helpful == Some(true) {
            helpful += 1;
        }
    }

    let mut top_measures: Vec<MeasureUsage> = measure_order
        .into_iter()
        .map(|name| {
            let count = measure_counts.get(&name).copied().unwrap_or(0);
            MeasureUsage { name, count }
        })
        .collect();
    top_measures.sort_by(|a, b| b.count.cmp(&a.count));
    top_measures.truncate(10);

    let queries_by_dataset = store
        .dataset_query_counts(since)?
        .into_iter()
        .filter(|(id, _, _)| dataset_id.map_or(true, |ds| ds == id))
        .map(|(dataset_id, dataset_name, count)| DatasetQueryCount {
            dataset_id,
            dataset_name,
            count,
        })
        .collect();

    Ok(QueryAnalytics {
        window_days,
        total_queries: total,
        successful_queries: successful,
        success_rate: if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        },
        queries_by_dataset,
        top_measures,
        query_types,
        average_execution_time_ms: store.average_execution_time(since, dataset_id)?,
        average_rating: if rated == 0 {
            None
        } else {
            Some(rating_sum as f64 / rated as f64)
        },
        rated_queries: rated,
        helpful_count: helpful,
    })
}

/// Questions that succeeded and were rated 4 or better, deduplicated by
/// trimmed, case-folded text. The first occurrence (best rated, then most
/// recent) wins; at most ten are returned.
pub fn popular_questions(
    store: &CatalogStore,
    dataset_id: &str,
) -> JournalResult<Vec<PopularQuestion>> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for entry in store.popular_candidates(dataset_id)? {
        let key = entry.question.trim().to_lowercase();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(PopularQuestion {
            question: entry.question,
            generated_query: entry.generated_query,
            user_rating: entry.user_rating,
            created_at: entry.created_at,
        });
        if out.len() == 10 {
            break;
        }
    }
    Ok(out)
}
