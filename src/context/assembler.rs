use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::config::ContextSettings;
use crate::context::dependency::{cached_dependencies, DependencyGraph};
use crate::expr::format_expression;
use crate::model::{BusinessRule, Column, Dataset, Measure, Relationship, Table};
use crate::store::{CatalogStore, StoreResult};

/// A question-scoped bundle of catalog metadata, sized to fit a caller's
/// character budget.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub dataset_id: String,
    pub question: String,
    pub query_type: String,
    pub measures: Vec<Measure>,
    pub tables: Vec<Table>,
    pub rules: Vec<BusinessRule>,
    pub history: Vec<SimilarQuery>,
    pub meta: ContextMeta,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextMeta {
    pub measure_count: usize,
    pub table_count: usize,
    pub rule_count: usize,
    pub history_count: usize,
    pub truncated: bool,
}

/// A prior successful, well-rated query resembling the current question.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarQuery {
    pub question: String,
    pub generated_query: Option<String>,
    pub user_rating: Option<i64>,
    pub created_at: i64,
    pub similarity: f64,
}

/// A table with its columns, for overview output.
#[derive(Debug, Clone, Serialize)]
pub struct TableContext {
    #[serde(flatten)]
    pub table: Table,
    pub columns: Vec<Column>,
}

/// Whole-dataset overview.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetContext {
    pub dataset: Dataset,
    pub tables: Vec<TableContext>,
    pub measure_count: usize,
    pub measures_by_type: BTreeMap<String, Vec<String>>,
    pub measures_by_area: BTreeMap<String, Vec<String>>,
    pub relationships: Vec<Relationship>,
}

/// Deep dive on a single measure.
#[derive(Debug, Clone, Serialize)]
pub struct MeasureContext {
    pub measure: Measure,
    pub formatted_expression: Option<String>,
    pub depends_on_measures: Vec<String>,
    pub referenced_columns: Vec<String>,
    pub dependents: Vec<String>,
    pub rules: Vec<BusinessRule>,
}

/// Lowercased alphanumeric tokens of a question, deduplicated, order kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Build a context bundle for a question against one dataset.
///
/// Measures and tables are scored against the question's tokens and only
/// scoring items are included, so an unmatched question yields a small
/// (possibly empty) bundle rather than the whole catalog. When the
/// serialized bundle exceeds the character budget, whole items are dropped
/// in relevance order: rules first, then the lowest-ranked tables, then the
/// lowest-ranked measures. History entries are never dropped.
pub fn assemble_query_context(
    store: &CatalogStore,
    settings: &ContextSettings,
    dataset_id: &str,
    question: &str,
    query_type: &str,
) -> StoreResult<ContextBundle> {
    let terms = tokenize(question);

    let mut measures: Vec<(i64, Measure)> = store
        .measures_for_dataset(dataset_id)?
        .into_iter()
        .filter_map(|m| match score_measure(&m, &terms) {
            0 => None,
            s => Some((s, m)),
        })
        .collect();
    measures.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    measures.truncate(settings.max_measures);
    let measures: Vec<Measure> = measures.into_iter().map(|(_, m)| m).collect();

    let mut tables: Vec<(i64, Table)> = store
        .tables_for_dataset(dataset_id)?
        .into_iter()
        .filter_map(|t| match score_table(&t, &terms) {
            0 => None,
            s => Some((s, t)),
        })
        .collect();
    tables.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    tables.truncate(settings.max_tables);
    let tables: Vec<Table> = tables.into_iter().map(|(_, t)| t).collect();

    let measure_names: Vec<String> = measures.iter().map(|m| m.name.clone()).collect();
    let table_names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
    let rules: Vec<BusinessRule> = store
        .active_rules(dataset_id)?
        .into_iter()
        .filter(|r| {
            r.applies_to_any(&measure_names, &table_names)
                || r.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(query_type))
        })
        .collect();

    let history = similar_history(store, settings, dataset_id, &terms)?;

    let mut bundle = ContextBundle {
        dataset_id: dataset_id.to_string(),
        question: question.to_string(),
        query_type: query_type.to_string(),
        measures,
        tables,
        rules,
        history,
        meta: ContextMeta::default(),
    };

    let mut truncated = false;
    loop {
        bundle.meta = ContextMeta {
            measure_count: bundle.measures.len(),
            table_count: bundle.tables.len(),
            rule_count: bundle.rules.len(),
            history_count: bundle.history.len(),
            truncated,
        };
        let size = serde_json::to_string(&bundle)?.len();
        if size <= settings.max_context_length {
            break;
        }
        let dropped = bundle.rules.pop().is_some()
            || bundle.tables.pop().is_some()
            || bundle.measures.pop().is_some();
        if !dropped {
            debug!(size, "context bundle over budget with nothing left to drop");
            break;
        }
        truncated = true;
    }

    Ok(bundle)
}

fn score_measure(measure: &Measure, terms: &[String]) -> i64 {
    let name = measure.name.to_lowercase();
    let area = measure.business_area.as_str().to_lowercase();
    let folder = measure.folder.as_deref().unwrap_or("").to_lowercase();

    let mut score = 0;
    for term in terms {
        if name.contains(term.as_str()) {
            score += 2;
        }
        if area.contains(term.as_str()) || (!folder.is_empty() && folder.contains(term.as_str())) {
            score += 1;
        }
    }
    score
}

fn score_table(table: &Table, terms: &[String]) -> i64 {
    let name = table.name.to_lowercase();
    let type_label = table.table_type.as_str().to_lowercase();

    let mut score = 0;
    for term in terms {
        if name.contains(term.as_str()) {
            score += 2;
        }
        if type_label == *term {
            score += 1;
        }
    }
    score
}

/// Successful, well-rated prior queries ranked by token overlap with the
/// current question. Ties break toward more recent entries.
fn similar_history(
    store: &CatalogStore,
    settings: &ContextSettings,
    dataset_id: &str,
    terms: &[String],
) -> StoreResult<Vec<SimilarQuery>> {
    let question_tokens: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
    if question_tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut scored: Vec<SimilarQuery> = store
        .popular_candidates(dataset_id)?
        .into_iter()
        .filter_map(|entry| {
            let tokens = tokenize(&entry.question);
            let candidate: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            let shared = question_tokens.intersection(&candidate).count();
            if shared == 0 {
                return None;
            }
            let union = question_tokens.union(&candidate).count();
            Some(SimilarQuery {
                question: entry.question,
                generated_query: entry.generated_query,
                user_rating: entry.user_rating,
                created_at: entry.created_at,
                similarity: shared as f64 / union as f64,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.created_at.cmp(&a.created_at))
    });
    scored.truncate(settings.max_history);
    Ok(scored)
}

/// Overview of one dataset: tables with columns, measure groupings, and
/// relationships. `None` when the dataset is not in the catalog.
pub fn dataset_context(
    store: &CatalogStore,
    dataset_id: &str,
) -> StoreResult<Option<DatasetContext>> {
    let Some(dataset) = store.get_dataset(dataset_id)? else {
        return Ok(None);
    };

    let mut tables = Vec::new();
    for table in store.tables_for_dataset(dataset_id)? {
        let columns = store.columns_for_table(table.id)?;
        tables.push(TableContext { table, columns });
    }

    let measures = store.measures_for_dataset(dataset_id)?;
    let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut by_area: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for m in &measures {
        by_type
            .entry(m.measure_type.as_str().to_string())
            .or_default()
            .push(m.name.clone());
        by_area
            .entry(m.business_area.as_str().to_string())
            .or_default()
            .push(m.name.clone());
    }

    Ok(Some(DatasetContext {
        dataset,
        tables,
        measure_count: measures.len(),
        measures_by_type: by_type,
        measures_by_area: by_area,
        relationships: store.relationships_for_dataset(dataset_id)?,
    }))
}

/// Deep dive on one measure: formatted expression, references both ways in
/// the dependency graph, and the rules that mention it.
pub fn measure_context(
    store: &CatalogStore,
    dataset_id: &str,
    measure_name: &str,
) -> StoreResult<Option<MeasureContext>> {
    let Some(measure) = store.get_measure(dataset_id, measure_name)? else {
        return Ok(None);
    };

    let referenced_columns = match measure.expression.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(expr) => cached_dependencies(store, dataset_id, measure_name, expr)?
            .columns
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let graph = DependencyGraph::build(store, dataset_id)?;
    let name = vec![measure.name.clone()];
    let rules: Vec<BusinessRule> = store
        .active_rules(dataset_id)?
        .into_iter()
        .filter(|r| r.applies_to_any(&name, &[]))
        .collect();

    Ok(Some(MeasureContext {
        formatted_expression: measure.expression.as_deref().map(format_expression),
        depends_on_measures: graph.dependencies_of(measure_name),
        referenced_columns,
        dependents: graph.dependents_of(measure_name),
        rules,
        measure,
    }))
}
