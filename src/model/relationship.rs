use serde::{Deserialize, Serialize};

/// Join cardinality between the two sides of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "One-to-Many")]
    OneToMany,
    #[serde(rename = "Many-to-One")]
    ManyToOne,
    #[serde(rename = "One-to-One")]
    OneToOne,
    #[serde(rename = "Many-to-Many")]
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToMany => "One-to-Many",
            Self::ManyToOne => "Many-to-One",
            Self::OneToOne => "One-to-One",
            Self::ManyToMany => "Many-to-Many",
        }
    }

    /// Parse a stored or discovered label (case-insensitive). Unknown labels
    /// default to `Many-to-One`, the common fact-to-dimension shape.
    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "one-to-many" | "onetomany" => Self::OneToMany,
            "one-to-one" | "onetoone" => Self::OneToOne,
            "many-to-many" | "manytomany" => Self::ManyToMany,
            _ => Self::ManyToOne,
        }
    }
}

/// Which way filters propagate across the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossFilterDirection {
    Single,
    Both,
}

impl CrossFilterDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Both => "Both",
        }
    }

    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "both" => Self::Both,
            _ => Self::Single,
        }
    }
}

/// A join definition between two tables of a dataset.
///
/// The from/to table and column names must reference existing tables and
/// columns within the same dataset. This is enforced at sync time, not as a
/// database constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub dataset_id: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub cross_filter: CrossFilterDirection,
    pub is_active: bool,
}
