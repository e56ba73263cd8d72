//! Context assembly.
//!
//! Builds question-scoped bundles of catalog metadata: scored measure and
//! table selection, applicable curated rules, similar prior queries, and a
//! serialized-size cap with whole-item truncation. Also provides dataset
//! overviews and per-measure deep dives backed by the dependency graph.

mod assembler;
mod dependency;

pub use assembler::{
    assemble_query_context, dataset_context, measure_context, tokenize, ContextBundle,
    ContextMeta, DatasetContext, MeasureContext, SimilarQuery, TableContext,
};
pub use dependency::DependencyGraph;
