use serde::{Deserialize, Serialize};

/// Derived aggregation style of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureType {
    #[serde(rename = "Time Intelligence")]
    TimeIntelligence,
    Ratio,
    Average,
    Sum,
    Count,
    Calculated,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeIntelligence => "Time Intelligence",
            Self::Ratio => "Ratio",
            Self::Average => "Average",
            Self::Sum => "Sum",
            Self::Count => "Count",
            Self::Calculated => "Calculated",
        }
    }

    /// Parse a stored label. Unknown labels fall back to `Calculated`.
    pub fn parse(label: &str) -> Self {
        match label {
            "Time Intelligence" => Self::TimeIntelligence,
            "Ratio" => Self::Ratio,
            "Average" => Self::Average,
            "Sum" => Self::Sum,
            "Count" => Self::Count,
            _ => Self::Calculated,
        }
    }
}

/// Derived business area of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessArea {
    Sales,
    Finance,
    Customer,
    Operations,
    General,
}

impl BusinessArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Finance => "Finance",
            Self::Customer => "Customer",
            Self::Operations => "Operations",
            Self::General => "General",
        }
    }

    /// Parse a stored label. Unknown labels fall back to `General`.
    pub fn parse(label: &str) -> Self {
        match label {
            "Sales" => Self::Sales,
            "Finance" => Self::Finance,
            "Customer" => Self::Customer,
            "Operations" => Self::Operations,
            _ => Self::General,
        }
    }
}

/// A substring rule: matches when the lower-cased name contains any pattern.
struct NameRule<L: Copy> {
    label: L,
    patterns: &'static [&'static str],
}

/// Type rules in precedence order. First match wins.
const TYPE_RULES: &[NameRule<MeasureType>] = &[
    NameRule {
        label: MeasureType::TimeIntelligence,
        patterns: &["ytd", "mtd", "yoy", "mom"],
    },
    NameRule {
        label: MeasureType::Ratio,
        patterns: &["%", "percent", "ratio"],
    },
    NameRule {
        label: MeasureType::Average,
        patterns: &["avg", "average"],
    },
    NameRule {
        label: MeasureType::Sum,
        patterns: &["sum", "total"],
    },
    NameRule {
        label: MeasureType::Count,
        patterns: &["count", "distinct"],
    },
];

/// Area rules in precedence order. First match wins.
const AREA_RULES: &[NameRule<BusinessArea>] = &[
    NameRule {
        label: BusinessArea::Sales,
        patterns: &["revenue", "sales", "income"],
    },
    NameRule {
        label: BusinessArea::Finance,
        patterns: &["cost", "expense"],
    },
    NameRule {
        label: BusinessArea::Finance,
        patterns: &["profit", "margin"],
    },
    NameRule {
        label: BusinessArea::Customer,
        patterns: &["customer", "client"],
    },
    NameRule {
        label: BusinessArea::Operations,
        patterns: &["inventory", "stock"],
    },
];

fn first_match<L: Copy>(rules: &[NameRule<L>], name_lower: &str, fallback: L) -> L {
    rules
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| name_lower.contains(p)))
        .map(|rule| rule.label)
        .unwrap_or(fallback)
}

/// The derived classification of a measure name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub measure_type: MeasureType,
    pub business_area: BusinessArea,
}

/// Classify a measure name along both dimensions independently.
///
/// Pure and total: any string, including the empty string, yields a result
/// (`Calculated` / `General` when nothing matches).
pub fn classify_measure(name: &str) -> Classification {
    let lower = name.to_lowercase();
    Classification {
        measure_type: first_match(TYPE_RULES, &lower, MeasureType::Calculated),
        business_area: first_match(AREA_RULES, &lower, BusinessArea::General),
    }
}
