//! # Atlas
//!
//! A metadata catalog and query journal for tabular analytical models.
//!
//! ## Architecture
//!
//! Atlas syncs model metadata from an external BI platform into a local
//! catalog and assembles question-scoped context bundles from it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              External BI Platform (REST API)             │
//! │        (workspaces, datasets, schema introspection)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [gateway]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Sync Engine                           │
//! │   (row mapping + classify + expression analysis)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [upserts]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Catalog Store (SQLite)                      │
//! │  tables · measures · relationships · rules · journal     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [scoring + truncation]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Context Assembler                        │
//! │     (bundles for natural-language query tooling)         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod expr;
pub mod gateway;
pub mod journal;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::classify::{classify_measure, BusinessArea, Classification, MeasureType};
    pub use crate::config::Settings;
    pub use crate::context::{ContextBundle, DatasetContext, MeasureContext};
    pub use crate::expr::{extract_dependencies, Dependencies};
    pub use crate::gateway::{ModelGateway, RestGateway, SchemaRows};
    pub use crate::model::{
        Dataset, Measure, NewQueryEntry, QueryFeedback, Relationship, Table, Workspace,
    };
    pub use crate::service::{CatalogService, ServiceError, ServiceResult};
    pub use crate::store::{CatalogStore, HistoryFilter};
    pub use crate::sync::{SyncEngine, SyncOutcome};
}

pub use service::{CatalogService, ServiceError, ServiceResult};
pub use store::CatalogStore;
