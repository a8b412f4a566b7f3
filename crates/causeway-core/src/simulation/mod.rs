//! Seeded random DAGs for experiments and property tests.
//!
//! A random causal order is drawn first; edges are then sampled uniformly
//! from the pairs that respect it, so every generated graph is acyclic.
//! The same seed always yields the same graph.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::engine::errors::SearchError;
use crate::engine::graph::{Graph, NodeId, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RandomDagConfig {
    pub num_nodes: usize,
    pub num_edges: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for RandomDagConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            num_edges: 10,
            seed: 42,
        }
    }
}

impl RandomDagConfig {
    pub fn new(num_nodes: usize, num_edges: usize, seed: u64) -> Self {
        Self {
            num_nodes,
            num_edges,
            seed,
        }
    }

    /// Edges of a complete DAG over `num_nodes`.
    pub fn max_edges(&self) -> usize {
        self.num_nodes * self.num_nodes.saturating_sub(1) / 2
    }
}

/// Continuous variables named `X1..Xn`.
pub fn variables(n: usize) -> Vec<Variable> {
    (1..=n).map(|i| Variable::continuous(format!("X{i}"))).collect()
}

/// Random DAG with exactly `num_edges` edges over `X1..Xn`.
///
/// Fails with `SearchError::InvalidConfig` if more edges are requested than
/// a DAG over `num_nodes` can hold.
pub fn random_dag(config: &RandomDagConfig) -> Result<Graph, SearchError> {
    if config.num_edges > config.max_edges() {
        return Err(SearchError::InvalidConfig(format!(
            "{} edges requested but a DAG over {} nodes holds at most {}",
            config.num_edges,
            config.num_nodes,
            config.max_edges()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut graph = Graph::new(variables(config.num_nodes))?;

    let mut order: Vec<NodeId> = graph.nodes().collect();
    order.shuffle(&mut rng);

    let mut candidates: Vec<(NodeId, NodeId)> = Vec::with_capacity(config.max_edges());
    for (i, &from) in order.iter().enumerate() {
        for &to in &order[i + 1..] {
            candidates.push((from, to));
        }
    }

    for &(from, to) in candidates.choose_multiple(&mut rng, config.num_edges) {
        graph.add_directed_edge(from, to);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        nodes = config.num_nodes,
        edges = graph.num_edges(),
        seed = config.seed,
        "generated random dag"
    );

    Ok(graph)
}
