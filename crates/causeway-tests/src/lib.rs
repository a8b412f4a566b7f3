//! Shared fixtures for the causeway integration and property tests.

use causeway_core::engine::graph::{Graph, NodeId, Variable};
use causeway_core::SearchError;

/// Continuous variables with the given names.
pub fn vars(names: &[&str]) -> Vec<Variable> {
    names.iter().map(|n| Variable::continuous(*n)).collect()
}

/// DAG over `names` with the given `from --> to` edges.
pub fn dag(names: &[&str], edges: &[(&str, &str)]) -> Result<Graph, SearchError> {
    let mut graph = Graph::new(vars(names))?;
    for &(from, to) in edges {
        let (f, t) = (graph.require_node(from)?, graph.require_node(to)?);
        graph.add_directed_edge(f, t);
    }
    Ok(graph)
}

/// Node id of `name`, for graphs built over known names.
pub fn node(graph: &Graph, name: &str) -> NodeId {
    graph.node_id(name).unwrap_or_else(|| panic!("no variable named {name}"))
}

/// Sorted edge strings, e.g. `["A --> B", "B --- C"]`.
pub fn edge_strings(graph: &Graph) -> Vec<String> {
    graph.edges().iter().map(|e| graph.edge_string(e)).collect()
}
