use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::expr::{extract_dependencies, Dependencies};
use crate::store::{expression_hash, CatalogStore, StoreResult};

/// Measure-to-measure reference graph for one dataset.
///
/// An edge `A -> B` means the expression of `A` references `B`. Column
/// references are kept per measure but do not participate in the graph.
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    columns: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for a dataset from stored measures.
    ///
    /// Extracted references are served from the store's dependency cache
    /// when the cached row matches the current expression hash; otherwise
    /// they are re-extracted and the cache is refreshed.
    pub fn build(store: &CatalogStore, dataset_id: &str) -> StoreResult<Self> {
        let measures = store.measures_for_dataset(dataset_id)?;

        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        let mut columns = HashMap::new();
        for m in &measures {
            let idx = graph.add_node(m.name.clone());
            nodes.insert(m.name.clone(), idx);
        }

        for m in &measures {
            let expr = match m.expression.as_deref().filter(|e| !e.trim().is_empty()) {
                Some(e) => e,
                None => continue,
            };
            let deps = cached_dependencies(store, dataset_id, &m.name, expr)?;
            columns.insert(m.name.clone(), deps.columns.iter().cloned().collect());

            let from = nodes[&m.name];
            for referenced in &deps.measures {
                // References to measures outside this dataset are dropped.
                if let Some(&to) = nodes.get(referenced) {
                    if to != from {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        Ok(Self {
            graph,
            nodes,
            columns,
        })
    }

    /// Measures the named measure's expression references directly.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Measures whose expressions reference the named measure directly.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Column references of the named measure's expression.
    pub fn columns_of(&self, name: &str) -> Vec<String> {
        self.columns.get(name).cloned().unwrap_or_default()
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

/// Dependencies for one expression, via the store cache.
pub(crate) fn cached_dependencies(
    store: &CatalogStore,
    dataset_id: &str,
    measure_name: &str,
    expression: &str,
) -> StoreResult<Dependencies> {
    let hash = expression_hash(expression);
    if let Some(hit) = store.get_measure_deps(dataset_id, measure_name, &hash)? {
        return Ok(hit);
    }
    let deps = extract_dependencies(expression);
    store.put_measure_deps(dataset_id, measure_name, &hash, &deps)?;
    Ok(deps)
}
