use serde::{Deserialize, Serialize};

/// Structural role of a table in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Fact,
    Dimension,
    Other,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "Fact",
            Self::Dimension => "Dimension",
            Self::Other => "Other",
        }
    }

    /// Parse a stored or discovered label. Unknown labels become `Other`.
    pub fn parse(label: &str) -> Self {
        match label {
            "Fact" => Self::Fact,
            "Dimension" => Self::Dimension,
            _ => Self::Other,
        }
    }

    /// Guess a table's role from its name when discovery carries no explicit
    /// type: `fact`/`dim` prefixes are the dominant warehouse convention.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.starts_with("fact") {
            Self::Fact
        } else if lower.starts_with("dim") {
            Self::Dimension
        } else {
            Self::Other
        }
    }
}

/// A table within a dataset. Name is unique within the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub dataset_id: String,
    pub name: String,
    pub table_type: TableType,
    pub description: Option<String>,
    pub is_hidden: bool,
}

/// A column within a table. Name is unique within the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub table_id: i64,
    pub name: String,
    pub data_type: Option<String>,
    pub is_hidden: bool,
}
