use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Column references take the quoted-table form `'Table'[Column]`.
static COLUMN_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'\[([^\]]+)\]").unwrap());

/// Any bracket-delimited token is a candidate measure reference.
static BRACKET_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

static GUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Calculation functions that make an expression look plausible.
const CALC_FUNCTIONS: &[&str] = &[
    "CALCULATE",
    "SUM",
    "AVERAGE",
    "COUNT",
    "DISTINCTCOUNT",
    "MAX",
    "MIN",
    "DIVIDE",
    "IF",
    "SWITCH",
    "VAR",
    "RETURN",
];

/// Keywords that start a new line when formatting an expression for display.
const FORMAT_KEYWORDS: &[&str] = &["CALCULATE", "RETURN", "VAR", "FILTER", "ALL", "VALUES"];

/// References extracted from a calculation expression.
///
/// Column references are rendered as `table.column`. Sets, so a reference
/// that appears several times in the expression is reported once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub measures: BTreeSet<String>,
    pub columns: BTreeSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty() && self.columns.is_empty()
    }
}

/// Extract measure and column references from a calculation expression.
///
/// Bracket tokens that are part of a `'Table'[Column]` pattern count as
/// column references only, never additionally as measures. An empty
/// expression yields two empty sets.
pub fn extract_dependencies(expression: &str) -> Dependencies {
    let mut deps = Dependencies::default();
    if expression.is_empty() {
        return deps;
    }

    for caps in COLUMN_REF.captures_iter(expression) {
        deps.columns.insert(format!("{}.{}", &caps[1], &caps[2]));
    }

    // Strip column patterns so their bracket halves are not double-counted.
    let remainder = COLUMN_REF.replace_all(expression, "");
    for caps in BRACKET_TOKEN.captures_iter(&remainder) {
        deps.measures.insert(caps[1].to_string());
    }

    deps
}

/// Heuristic plausibility check: the expression is non-empty and mentions at
/// least one known calculation function (case-insensitive substring).
///
/// Not a parser. False negatives are acceptable, false positives tolerated.
pub fn looks_like_valid_expression(expression: &str) -> bool {
    if expression.is_empty() {
        return false;
    }
    let upper = expression.to_uppercase();
    CALC_FUNCTIONS.iter().any(|f| upper.contains(f))
}

/// Format a calculation expression for display by breaking before common
/// block-starting keywords and trimming blank lines.
pub fn format_expression(expression: &str) -> String {
    if expression.is_empty() {
        return String::new();
    }

    let mut formatted = expression.to_string();
    for keyword in FORMAT_KEYWORDS {
        formatted = formatted.replace(&format!("{keyword}("), &format!("\n{keyword}("));
        formatted = formatted.replace(&format!("{keyword} ("), &format!("\n{keyword} ("));
    }

    formatted
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Table names may not contain filesystem-hostile characters.
pub fn is_valid_table_name(name: &str) -> bool {
    const INVALID: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    !name.is_empty() && !name.contains(INVALID)
}

/// External workspace and dataset identifiers are GUIDs.
pub fn is_guid(id: &str) -> bool {
    GUID.is_match(id)
}
