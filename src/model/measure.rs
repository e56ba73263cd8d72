use serde::{Deserialize, Serialize};

use crate::classify::{BusinessArea, MeasureType};

/// A named calculation formula over a dataset, evaluated at query time.
///
/// Name is unique within the dataset. Type and area tags are derived by the
/// classifier at sync time unless the discovered row carried explicit
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub id: i64,
    pub dataset_id: String,
    pub name: String,
    /// Home table in the model, when discovery reported one.
    pub table_name: Option<String>,
    pub expression: Option<String>,
    pub measure_type: MeasureType,
    pub business_area: BusinessArea,
    /// Display folder grouping.
    pub folder: Option<String>,
    pub description: Option<String>,
    pub is_hidden: bool,
}
