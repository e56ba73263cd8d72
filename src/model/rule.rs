use serde::{Deserialize, Serialize};

/// A curated, human-authored explanation or constraint tied to measures and
/// tables.
///
/// Rules are written by an external curation process; this crate only reads
/// them when assembling context. A rule without a dataset id applies
/// catalog-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: i64,
    pub dataset_id: Option<String>,
    pub name: String,
    /// Calculation, Validation, Transformation, ...
    pub category: Option<String>,
    pub business_area: Option<String>,
    pub description: String,
    /// Plain-language explanation of the rule.
    pub rule_logic: Option<String>,
    /// Calculation implementation, when the rule has one.
    pub calculation: Option<String>,
    pub applies_to_measures: Vec<String>,
    pub applies_to_tables: Vec<String>,
    pub is_active: bool,
    pub version: String,
}

impl BusinessRule {
    /// Whether the rule touches any of the given measure or table names
    /// (case-insensitive).
    pub fn applies_to_any(&self, measures: &[String], tables: &[String]) -> bool {
        let hit = |targets: &[String], names: &[String]| {
            targets
                .iter()
                .any(|t| names.iter().any(|n| n.eq_ignore_ascii_case(t)))
        };
        hit(&self.applies_to_measures, measures) || hit(&self.applies_to_tables, tables)
    }
}
