//! # Causal Graph
//!
//! Mixed graph over a fixed variable set, used for both phases of a search.
//!
//! ## Key Components
//!
//! - **Variable**: immutable, cheaply clonable identifier (name + domain kind)
//! - **Endpoint**: edge mark at one end of an edge (`Tail`, `Arrow`, `Circle`, `Null`)
//! - **Edge**: unordered node pair carrying one mark per end
//! - **Graph**: node set fixed at construction, at most one edge per unordered pair
//!
//! ## Design
//!
//! - Nodes are addressed by dense `NodeId`s (index into the variable list).
//! - Edges live in a hash map keyed by the normalized pair `(min, max)`, giving
//!   O(1) adjacency and edge lookups.
//! - Per-node neighbour lists are kept sorted so every traversal iterates in
//!   `NodeId` order. Searches built on top of the graph are deterministic as a
//!   consequence.
//! - A directed edge `A --> B` is `Tail` at `A` and `Arrow` at `B`; an
//!   undirected edge `A --- B` is `Tail` at both ends.
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::engine::graph::{Graph, Variable};
//!
//! let vars = vec![Variable::continuous("A"), Variable::continuous("B")];
//! let mut graph = Graph::new(vars).unwrap();
//! let a = graph.node_id("A").unwrap();
//! let b = graph.node_id("B").unwrap();
//! graph.add_directed_edge(a, b);
//! assert!(graph.is_directed_from_to(a, b));
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::engine::errors::SearchError;

/// Maximum size for inline storage of neighbour lists.
const INLINE_NEIGHBOURS: usize = 8;

/// Neighbour list type; sorted by `NodeId`.
pub type Neighbours = SmallVec<[NodeId; INLINE_NEIGHBOURS]>;

/// A unique identifier for a node in a graph.
///
/// NodeId implements Ord/PartialOrd for stable, deterministic iteration.
/// It is the index of the node's variable in [`Graph::variables`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Domain of a variable. Only a marker; the search never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VariableKind {
    #[default]
    Continuous,
    Discrete,
}

/// A measured variable.
///
/// Equality is by name and kind. Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: Arc<str>,
    kind: VariableKind,
}

impl Variable {
    pub fn new(name: impl Into<Arc<str>>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn continuous(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, VariableKind::Continuous)
    }

    pub fn discrete(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, VariableKind::Discrete)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Mark at one end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endpoint {
    Tail,
    Arrow,
    Circle,
    Null,
}

/// An edge between two distinct nodes.
///
/// `endpoint1` is the mark at `node1`, `endpoint2` the mark at `node2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub node1: NodeId,
    pub node2: NodeId,
    pub endpoint1: Endpoint,
    pub endpoint2: Endpoint,
}

impl Edge {
    pub fn new(node1: NodeId, node2: NodeId, endpoint1: Endpoint, endpoint2: Endpoint) -> Self {
        Self {
            node1,
            node2,
            endpoint1,
            endpoint2,
        }
    }

    /// `a --- b`
    pub fn undirected(a: NodeId, b: NodeId) -> Self {
        Self::new(a, b, Endpoint::Tail, Endpoint::Tail)
    }

    /// `from --> to`
    pub fn directed(from: NodeId, to: NodeId) -> Self {
        Self::new(from, to, Endpoint::Tail, Endpoint::Arrow)
    }

    /// Mark at `node`, or `None` if `node` is not an end of this edge.
    pub fn endpoint_at(&self, node: NodeId) -> Option<Endpoint> {
        if node == self.node1 {
            Some(self.endpoint1)
        } else if node == self.node2 {
            Some(self.endpoint2)
        } else {
            None
        }
    }

    /// The end of this edge opposite `node`.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.node1 {
            Some(self.node2)
        } else if node == self.node2 {
            Some(self.node1)
        } else {
            None
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(
            (self.endpoint1, self.endpoint2),
            (Endpoint::Tail, Endpoint::Arrow) | (Endpoint::Arrow, Endpoint::Tail)
        )
    }

    pub fn is_undirected(&self) -> bool {
        self.endpoint1 == Endpoint::Tail && self.endpoint2 == Endpoint::Tail
    }

    /// For a directed edge, `(tail, head)`.
    pub fn direction(&self) -> Option<(NodeId, NodeId)> {
        match (self.endpoint1, self.endpoint2) {
            (Endpoint::Tail, Endpoint::Arrow) => Some((self.node1, self.node2)),
            (Endpoint::Arrow, Endpoint::Tail) => Some((self.node2, self.node1)),
            _ => None,
        }
    }

    fn set_endpoint_at(&mut self, node: NodeId, mark: Endpoint) -> bool {
        if node == self.node1 {
            self.endpoint1 = mark;
            true
        } else if node == self.node2 {
            self.endpoint2 = mark;
            true
        } else {
            false
        }
    }
}

#[inline]
fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Graph over a fixed variable set with at most one edge per unordered pair.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    variables: Vec<Variable>,
    by_name: FxHashMap<Arc<str>, NodeId>,
    edges: FxHashMap<(NodeId, NodeId), Edge>,
    neighbours: Vec<Neighbours>,
}

impl Graph {
    /// Creates an edgeless graph over `variables`.
    ///
    /// Returns `SearchError::DuplicateVariable` if two variables share a name.
    pub fn new(variables: Vec<Variable>) -> Result<Self, SearchError> {
        let mut by_name = FxHashMap::default();
        by_name.reserve(variables.len());
        for (i, var) in variables.iter().enumerate() {
            if by_name.insert(var.name.clone(), NodeId(i as u32)).is_some() {
                return Err(SearchError::DuplicateVariable(var.name().to_string()));
            }
        }
        let neighbours = vec![Neighbours::new(); variables.len()];
        Ok(Self {
            variables,
            by_name,
            edges: FxHashMap::default(),
            neighbours,
        })
    }

    /// Same variable set, no edges.
    pub fn empty_like(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            by_name: self.by_name.clone(),
            edges: FxHashMap::default(),
            neighbours: vec![Neighbours::new(); self.variables.len()],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.variables.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.variables.len() as u32).map(NodeId)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn variable(&self, id: NodeId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.variables[id.index()].name()
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Like [`node_id`](Self::node_id) but reports unknown names as errors.
    pub fn require_node(&self, name: &str) -> Result<NodeId, SearchError> {
        self.node_id(name)
            .ok_or_else(|| SearchError::UnknownVariable(name.to_string()))
    }

    pub fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.edges.contains_key(&pair_key(a, b))
    }

    /// Neighbours of `node`, sorted by id.
    pub fn adjacent_nodes(&self, node: NodeId) -> &[NodeId] {
        &self.neighbours[node.index()]
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbours[node.index()].len()
    }

    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.edges.get(&pair_key(a, b))
    }

    /// All edges, sorted by normalized node pair.
    pub fn edges(&self) -> Vec<Edge> {
        let mut keys: Vec<_> = self.edges.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter().map(|k| self.edges[&k]).collect()
    }

    /// Inserts `edge` unless it is a self loop or the pair is already adjacent.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if edge.node1 == edge.node2 {
            return false;
        }
        let key = pair_key(edge.node1, edge.node2);
        if self.edges.contains_key(&key) {
            return false;
        }
        self.edges.insert(key, edge);
        insert_sorted(&mut self.neighbours[edge.node1.index()], edge.node2);
        insert_sorted(&mut self.neighbours[edge.node2.index()], edge.node1);
        true
    }

    pub fn add_undirected_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        self.add_edge(Edge::undirected(a, b))
    }

    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        self.add_edge(Edge::directed(from, to))
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Option<Edge> {
        let removed = self.edges.remove(&pair_key(a, b))?;
        remove_sorted(&mut self.neighbours[a.index()], b);
        remove_sorted(&mut self.neighbours[b.index()], a);
        Some(removed)
    }

    /// Mark at `to` on the edge between `from` and `to`.
    pub fn endpoint(&self, from: NodeId, to: NodeId) -> Option<Endpoint> {
        self.edge(from, to).and_then(|e| e.endpoint_at(to))
    }

    /// Sets the mark at `to` on the edge between `from` and `to`.
    ///
    /// Returns `false` if the nodes are not adjacent.
    pub fn set_endpoint(&mut self, from: NodeId, to: NodeId, mark: Endpoint) -> bool {
        match self.edges.get_mut(&pair_key(from, to)) {
            Some(edge) => edge.set_endpoint_at(to, mark),
            None => false,
        }
    }

    /// Replaces whatever marks the pair carries with `from --> to`.
    pub fn orient(&mut self, from: NodeId, to: NodeId) -> bool {
        self.set_endpoint(to, from, Endpoint::Tail) && self.set_endpoint(from, to, Endpoint::Arrow)
    }

    /// Sets every mark of every edge to `Tail`.
    pub fn make_undirected(&mut self) {
        for edge in self.edges.values_mut() {
            edge.endpoint1 = Endpoint::Tail;
            edge.endpoint2 = Endpoint::Tail;
        }
    }

    pub fn is_directed_from_to(&self, from: NodeId, to: NodeId) -> bool {
        self.endpoint(to, from) == Some(Endpoint::Tail)
            && self.endpoint(from, to) == Some(Endpoint::Arrow)
    }

    pub fn is_undirected(&self, a: NodeId, b: NodeId) -> bool {
        self.edge(a, b).is_some_and(|e| e.is_undirected())
    }

    /// Nodes `p` with `p --> node`.
    pub fn parents(&self, node: NodeId) -> Vec<NodeId> {
        self.adjacent_nodes(node)
            .iter()
            .copied()
            .filter(|&p| self.is_directed_from_to(p, node))
            .collect()
    }

    /// Nodes `c` with `node --> c`.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.adjacent_nodes(node)
            .iter()
            .copied()
            .filter(|&c| self.is_directed_from_to(node, c))
            .collect()
    }

    /// True if a path `from --> ... --> to` of length >= 0 exists.
    pub fn exists_directed_path(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut seen = vec![false; self.num_nodes()];
        let mut queue = VecDeque::from([from]);
        seen[from.index()] = true;
        while let Some(current) = queue.pop_front() {
            for &next in self.adjacent_nodes(current) {
                if seen[next.index()] || !self.is_directed_from_to(current, next) {
                    continue;
                }
                if next == to {
                    return true;
                }
                seen[next.index()] = true;
                queue.push_back(next);
            }
        }
        false
    }

    /// True if `a` is an ancestor of `b` (every node is its own ancestor).
    pub fn is_ancestor_of(&self, a: NodeId, b: NodeId) -> bool {
        self.exists_directed_path(a, b)
    }

    /// True if orienting `from --> to` would close a directed cycle.
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        self.exists_directed_path(to, from)
    }

    /// True if the directed edges of this graph contain a cycle.
    pub fn has_directed_cycle(&self) -> bool {
        let n = self.num_nodes();
        let mut in_degree = vec![0usize; n];
        for edge in self.edges.values() {
            if let Some((_, head)) = edge.direction() {
                in_degree[head.index()] += 1;
            }
        }
        let mut queue: VecDeque<NodeId> = self
            .nodes()
            .filter(|node| in_degree[node.index()] == 0)
            .collect();
        let mut visited = 0;
        while let Some(node) = queue.pop_front() {
            visited += 1;
            for child in self.children(node) {
                in_degree[child.index()] -= 1;
                if in_degree[child.index()] == 0 {
                    queue.push_back(child);
                }
            }
        }
        visited != n
    }

    /// True if every edge is directed and there is no directed cycle.
    pub fn is_dag(&self) -> bool {
        self.edges.values().all(Edge::is_directed) && !self.has_directed_cycle()
    }

    /// Nodes in an order where every parent precedes its children.
    ///
    /// Only directed edges are considered. Returns `None` on a directed cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let n = self.num_nodes();
        let mut in_degree = vec![0usize; n];
        for edge in self.edges.values() {
            if let Some((_, head)) = edge.direction() {
                in_degree[head.index()] += 1;
            }
        }
        let mut ready: VecDeque<NodeId> = self
            .nodes()
            .filter(|node| in_degree[node.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = ready.pop_front() {
            order.push(node);
            for child in self.children(node) {
                in_degree[child.index()] -= 1;
                if in_degree[child.index()] == 0 {
                    ready.push_back(child);
                }
            }
        }
        (order.len() == n).then_some(order)
    }

    /// d-separation of `x` and `y` given `z`, over the directed edges.
    ///
    /// Uses the reachable-set formulation: a trail is active when every
    /// collider on it has a descendant in `z` and no non-collider is in `z`.
    pub fn is_d_separated(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> bool {
        if x == y {
            return false;
        }
        let n = self.num_nodes();
        let mut in_z = vec![false; n];
        for node in z {
            in_z[node.index()] = true;
        }
        if in_z[x.index()] || in_z[y.index()] {
            return true;
        }

        // Ancestors of the conditioning set, including the set itself.
        let mut anc_z = in_z.clone();
        let mut stack: Vec<NodeId> = z.to_vec();
        while let Some(node) = stack.pop() {
            for parent in self.parents(node) {
                if !anc_z[parent.index()] {
                    anc_z[parent.index()] = true;
                    stack.push(parent);
                }
            }
        }

        // (node, arrived_from_child): true travels up to parents, false down.
        let mut visited: FxHashSet<(NodeId, bool)> = FxHashSet::default();
        let mut queue = VecDeque::from([(x, true)]);
        while let Some((node, up)) = queue.pop_front() {
            if !visited.insert((node, up)) {
                continue;
            }
            if node == y {
                return false;
            }
            let conditioned = in_z[node.index()];
            if up && !conditioned {
                for parent in self.parents(node) {
                    queue.push_back((parent, true));
                }
                for child in self.children(node) {
                    queue.push_back((child, false));
                }
            } else if !up {
                if !conditioned {
                    for child in self.children(node) {
                        queue.push_back((child, false));
                    }
                }
                if anc_z[node.index()] {
                    for parent in self.parents(node) {
                        queue.push_back((parent, true));
                    }
                }
            }
        }
        true
    }

    /// Renders an edge as `A --> B`, `A --- B`, `A <-> B`, `A o-> B`, ...
    /// A `Null` mark prints as `.`.
    pub fn edge_string(&self, edge: &Edge) -> String {
        let left = match edge.endpoint1 {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '<',
            Endpoint::Circle => 'o',
            Endpoint::Null => '.',
        };
        let right = match edge.endpoint2 {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '>',
            Endpoint::Circle => 'o',
            Endpoint::Null => '.',
        };
        format!(
            "{} {}-{} {}",
            self.name(edge.node1),
            left,
            right,
            self.name(edge.node2)
        )
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Nodes:")?;
        let names: Vec<&str> = self.variables.iter().map(Variable::name).collect();
        writeln!(f, "{}", names.join(";"))?;
        writeln!(f)?;
        writeln!(f, "Graph Edges:")?;
        for (i, edge) in self.edges().iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, self.edge_string(edge))?;
        }
        Ok(())
    }
}

fn insert_sorted(list: &mut Neighbours, node: NodeId) {
    if let Err(pos) = list.binary_search(&node) {
        list.insert(pos, node);
    }
}

fn remove_sorted(list: &mut Neighbours, node: NodeId) {
    if let Ok(pos) = list.binary_search(&node) {
        list.remove(pos);
    }
}
