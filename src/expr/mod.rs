//! Calculation-expression analysis.
//!
//! Best-effort scanning of DAX-like calculation expressions: reference
//! extraction for dependency tracking, a plausibility check against a
//! whitelist of calculation functions, and display formatting. None of this
//! is a parser; malformed input yields partial matches, never an error.

mod analyzer;

pub use analyzer::{
    extract_dependencies, format_expression, is_guid, is_valid_table_name,
    looks_like_valid_expression, Dependencies,
};
