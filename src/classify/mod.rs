//! Semantic classification of measures.
//!
//! Derives a measure's type and business area from its name using ordered
//! substring heuristics. The rule order is a contract: within each dimension
//! the first matching rule wins, so e.g. a name containing both "revenue"
//! and "cost" classifies as Sales.

mod rules;

pub use rules::{classify_measure, BusinessArea, Classification, MeasureType};
