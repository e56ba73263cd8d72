//! Catalog entity types.
//!
//! Workspaces own datasets; a dataset exclusively owns its tables, columns,
//! measures, relationships, business rules and query history (deleting a
//! dataset cascades to all of them). All of these records are created or
//! refreshed by the sync engine, except business rules (curated externally,
//! read-only here) and query history (written by the journal).

mod dataset;
mod history;
mod measure;
mod relationship;
mod rule;
mod table;
mod workspace;

pub use dataset::Dataset;
pub use history::{NewQueryEntry, QueryFeedback, QueryHistoryEntry};
pub use measure::Measure;
pub use relationship::{Cardinality, CrossFilterDirection, Relationship};
pub use rule::BusinessRule;
pub use table::{Column, Table, TableType};
pub use workspace::Workspace;
