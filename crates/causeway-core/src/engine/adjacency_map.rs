//! Working adjacency state of the adjacency search.
//!
//! Starts as the complete graph over `n` nodes and only ever loses edges.
//! Removal updates both endpoints, so the relation is symmetric after every
//! operation. Neighbour lists are kept sorted for deterministic iteration.

use smallvec::SmallVec;

use crate::engine::graph::{Graph, NodeId};

/// Maximum size for inline storage in SmallVec
const INLINE_VEC_SIZE: usize = 8;

type NeighbourList = SmallVec<[NodeId; INLINE_VEC_SIZE]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMap {
    neighbours: Vec<NeighbourList>,
    num_edges: usize,
}

impl AdjacencyMap {
    /// Complete graph over `n` nodes, no self loops.
    pub fn complete(n: usize) -> Self {
        let neighbours = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| NodeId(j as u32))
                    .collect()
            })
            .collect();
        Self {
            neighbours,
            num_edges: n * n.saturating_sub(1) / 2,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.neighbours.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbours[a.index()].binary_search(&b).is_ok()
    }

    /// Neighbours of `node`, sorted by id.
    pub fn adjacent(&self, node: NodeId) -> &[NodeId] {
        &self.neighbours[node.index()]
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbours[node.index()].len()
    }

    pub fn max_degree(&self) -> usize {
        self.neighbours.iter().map(SmallVec::len).max().unwrap_or(0)
    }

    /// Removes `{a, b}`. Returns `false` if they were not adjacent.
    pub fn remove(&mut self, a: NodeId, b: NodeId) -> bool {
        let Ok(pos_b) = self.neighbours[a.index()].binary_search(&b) else {
            return false;
        };
        self.neighbours[a.index()].remove(pos_b);
        if let Ok(pos_a) = self.neighbours[b.index()].binary_search(&a) {
            self.neighbours[b.index()].remove(pos_a);
        }
        self.num_edges -= 1;
        true
    }

    /// Adjacent unordered pairs `(a, b)` with `a < b`, in lexicographic order.
    pub fn pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::with_capacity(self.num_edges);
        for (i, list) in self.neighbours.iter().enumerate() {
            let a = NodeId(i as u32);
            out.extend(list.iter().copied().filter(|&b| b > a).map(|b| (a, b)));
        }
        out
    }

    /// `adj(x) \ {y}`.
    pub fn pool_excluding(&self, x: NodeId, y: NodeId) -> Vec<NodeId> {
        self.adjacent(x).iter().copied().filter(|&n| n != y).collect()
    }

    /// `(adj(x) \ {y}) ∪ (adj(y) \ {x})`, sorted and deduplicated.
    pub fn union_pool(&self, x: NodeId, y: NodeId) -> Vec<NodeId> {
        let (left, right) = (self.adjacent(x), self.adjacent(y));
        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let next = match (left.get(i), right.get(j)) {
                (Some(&l), Some(&r)) if l == r => {
                    i += 1;
                    j += 1;
                    l
                }
                (Some(&l), Some(&r)) if l < r => {
                    i += 1;
                    l
                }
                (Some(_), Some(&r)) => {
                    j += 1;
                    r
                }
                (Some(&l), None) => {
                    i += 1;
                    l
                }
                (None, Some(&r)) => {
                    j += 1;
                    r
                }
                (None, None) => break,
            };
            if next != x && next != y {
                out.push(next);
            }
        }
        out
    }

    /// True if every edge of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &AdjacencyMap) -> bool {
        self.num_nodes() == other.num_nodes()
            && self
                .pairs()
                .into_iter()
                .all(|(a, b)| other.is_adjacent(a, b))
    }

    /// Undirected graph over `graph`'s nodes with one edge per adjacent pair.
    pub fn to_graph(&self, template: &Graph) -> Graph {
        let mut out = template.empty_like();
        for (a, b) in self.pairs() {
            out.add_undirected_edge(a, b);
        }
        out
    }
}
