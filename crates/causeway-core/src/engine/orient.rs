//! Orientation of an adjacency-search skeleton.
//!
//! Turns the undirected skeleton and its sepsets into a partially directed
//! graph (a pattern):
//!
//! 1. Reset every edge to `Tail`-`Tail`.
//! 2. Apply background knowledge: add or orient required edges, point
//!    adjacent pairs away from forbidden orientations.
//! 3. Orient unshielded colliders `x --> y <-- z`.
//! 4. Close under the Meek rules ([`MeekRules`]).
//!
//! ## Collider policies
//!
//! - [`ColliderPolicy::Sepset`] decides each unshielded triple from the
//!   recorded sepset of `{x, z}`: `y` absent means collider.
//! - [`ColliderPolicy::Conservative`] re-tests every subset of `adj(x)` and
//!   `adj(z)` and only orients when all separating sets agree. It needs the
//!   oracle, see [`OrientationEngine::orient_with_oracle`].
//!
//! A collider whose arrowheads are blocked (forbidden by knowledge, in
//! conflict with an earlier orientation, or closing a cycle) is not forced:
//! the triple is reported as ambiguous and both edges are left as they are.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::engine::choice::ChoiceGenerator;
use crate::engine::errors::SearchError;
use crate::engine::fas::MAX_SEARCH_DEPTH;
use crate::engine::graph::{Endpoint, Graph, NodeId};
use crate::engine::knowledge::Knowledge;
use crate::engine::meek::{MeekOrientation, MeekRules};
use crate::engine::oracle::{IndependenceTest, TestCache};
use crate::engine::sepset::SepsetMap;

/// How unshielded triples are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColliderPolicy {
    #[default]
    Sepset,
    Conservative,
}

/// A path `x --- y --- z` with `x < z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub x: NodeId,
    pub y: NodeId,
    pub z: NodeId,
}

impl Triple {
    pub fn new(x: NodeId, y: NodeId, z: NodeId) -> Self {
        if x <= z {
            Self { x, y, z }
        } else {
            Self { x: z, y, z: x }
        }
    }

    /// `<X, Y, Z>` with names from `graph`.
    pub fn describe(&self, graph: &Graph) -> String {
        format!(
            "<{}, {}, {}>",
            graph.name(self.x),
            graph.name(self.y),
            graph.name(self.z)
        )
    }
}

/// What the orientation pass did, beyond the graph itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientationReport {
    /// Edges oriented (or added) because of required/forbidden knowledge.
    pub knowledge_oriented: Vec<(NodeId, NodeId)>,
    /// Unshielded triples oriented as `x --> y <-- z`.
    pub colliders: Vec<Triple>,
    /// Unshielded triples judged non-colliders by the conservative policy.
    pub noncolliders: Vec<Triple>,
    /// Triples whose evidence was conflicting or could not be applied.
    pub ambiguous: Vec<Triple>,
    /// Orientations added by the Meek closure, in order.
    pub meek: Vec<MeekOrientation>,
    /// Oracle failures during conservative triple classification.
    pub oracle_failures: u64,
}

impl OrientationReport {
    pub fn is_ambiguous(&self, triple: &Triple) -> bool {
        self.ambiguous.contains(triple)
    }
}

/// Orients skeletons produced by the adjacency search.
#[derive(Debug, Clone)]
pub struct OrientationEngine<'a> {
    knowledge: Cow<'a, Knowledge>,
    policy: ColliderPolicy,
    rule4: Option<bool>,
    depth: i32,
}

impl Default for OrientationEngine<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> OrientationEngine<'a> {
    pub fn new() -> Self {
        Self {
            knowledge: Cow::Owned(Knowledge::default()),
            policy: ColliderPolicy::Sepset,
            rule4: None,
            depth: -1,
        }
    }

    pub fn with_knowledge(mut self, knowledge: &'a Knowledge) -> Self {
        self.knowledge = Cow::Borrowed(knowledge);
        self
    }

    pub fn with_collider_policy(mut self, policy: ColliderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Forces Meek R4 on or off; by default it runs iff knowledge is non-empty.
    pub fn with_rule4(mut self, enabled: Option<bool>) -> Self {
        self.rule4 = enabled;
        self
    }

    /// Bound on conditioning-set size for the conservative policy (`-1` unbounded).
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn collider_policy(&self) -> ColliderPolicy {
        self.policy
    }

    /// Orients `graph` using the recorded sepsets.
    ///
    /// Fails with `InvalidConfig` under the conservative policy, which needs
    /// [`orient_with_oracle`](Self::orient_with_oracle).
    pub fn orient(
        &self,
        graph: Graph,
        sepsets: &SepsetMap,
    ) -> Result<(Graph, OrientationReport), SearchError> {
        if self.policy == ColliderPolicy::Conservative {
            return Err(SearchError::InvalidConfig(
                "conservative collider orientation needs an independence oracle".into(),
            ));
        }
        self.orient_inner(graph, |engine, graph, report| {
            engine.orient_colliders_from_sepsets(graph, sepsets, report);
            Ok(())
        })
    }

    /// Orients `graph`; the oracle is consulted only under the conservative
    /// policy, through `cache`.
    pub fn orient_with_oracle<T: IndependenceTest + ?Sized>(
        &self,
        graph: Graph,
        sepsets: &SepsetMap,
        oracle: &T,
        cache: &mut TestCache,
    ) -> Result<(Graph, OrientationReport), SearchError> {
        match self.policy {
            ColliderPolicy::Sepset => self.orient_inner(graph, |engine, graph, report| {
                engine.orient_colliders_from_sepsets(graph, sepsets, report);
                Ok(())
            }),
            ColliderPolicy::Conservative => {
                let max_depth = match self.depth {
                    -1 => MAX_SEARCH_DEPTH,
                    d if d < -1 => return Err(SearchError::InvalidDepth(d)),
                    d => d as usize,
                };
                self.orient_inner(graph, |engine, graph, report| {
                    engine.orient_colliders_conservatively(graph, oracle, cache, max_depth, report);
                    Ok(())
                })
            }
        }
    }

    fn orient_inner<F>(&self, mut graph: Graph, colliders: F) -> Result<(Graph, OrientationReport), SearchError>
    where
        F: FnOnce(&Self, &mut Graph, &mut OrientationReport) -> Result<(), SearchError>,
    {
        self.knowledge.validate()?;
        self.knowledge.check_names(&graph)?;

        let mut report = OrientationReport::default();
        graph.make_undirected();
        self.orient_knowledge(&mut graph, &mut report)?;
        colliders(self, &mut graph, &mut report)?;

        let mut meek = MeekRules::new().with_knowledge(&self.knowledge);
        if let Some(enabled) = self.rule4 {
            meek = meek.with_rule4(enabled);
        }
        report.meek = meek.orient_implied(&mut graph);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            knowledge = report.knowledge_oriented.len(),
            colliders = report.colliders.len(),
            ambiguous = report.ambiguous.len(),
            meek = report.meek.len(),
            "orientation complete"
        );

        Ok((graph, report))
    }

    /// Required edges first (added when missing), then forbidden orientations.
    fn orient_knowledge(&self, graph: &mut Graph, report: &mut OrientationReport) -> Result<(), SearchError> {
        for (from, to) in self.knowledge.required_edges() {
            let (f, t) = (graph.require_node(from)?, graph.require_node(to)?);
            if graph.would_create_cycle(f, t) {
                return Err(SearchError::KnowledgeContradiction(format!(
                    "required {from} --> {to} closes a directed cycle"
                )));
            }
            if graph.is_adjacent(f, t) {
                graph.orient(f, t);
            } else {
                graph.add_directed_edge(f, t);
            }
            report.knowledge_oriented.push((f, t));
        }

        for edge in graph.edges() {
            if !edge.is_undirected() {
                continue;
            }
            let (a, b) = (edge.node1, edge.node2);
            let forbid_ab = self.knowledge.is_forbidden(graph.name(a), graph.name(b));
            let forbid_ba = self.knowledge.is_forbidden(graph.name(b), graph.name(a));
            let target = match (forbid_ab, forbid_ba) {
                (true, false) => Some((b, a)),
                (false, true) => Some((a, b)),
                _ => None,
            };
            if let Some((from, to)) = target {
                if !graph.would_create_cycle(from, to) {
                    graph.orient(from, to);
                    report.knowledge_oriented.push((from, to));
                }
            }
        }
        Ok(())
    }

    /// True if the mark at `to` on `from --- to` may become an arrowhead.
    fn arrow_allowed(&self, graph: &Graph, from: NodeId, to: NodeId) -> bool {
        match (graph.endpoint(to, from), graph.endpoint(from, to)) {
            (Some(Endpoint::Tail), Some(Endpoint::Arrow)) => true,
            (Some(Endpoint::Tail), Some(Endpoint::Tail)) => {
                let (f, t) = (graph.name(from), graph.name(to));
                !self.knowledge.is_forbidden(f, t)
                    && !self.knowledge.is_required(t, f)
                    && !graph.would_create_cycle(from, to)
            }
            _ => false,
        }
    }

    /// Orients `x --> y <-- z` if both arrowheads are allowed; otherwise
    /// records the triple as ambiguous.
    fn try_collider(&self, graph: &mut Graph, triple: Triple, report: &mut OrientationReport) {
        if self.arrow_allowed(graph, triple.x, triple.y) && self.arrow_allowed(graph, triple.z, triple.y) {
            graph.orient(triple.x, triple.y);
            graph.orient(triple.z, triple.y);
            report.colliders.push(triple);
        } else {
            report.ambiguous.push(triple);
        }
    }

    /// Unshielded triples `x --- y --- z` in (y, x, z) order.
    fn unshielded_triples(graph: &Graph) -> Vec<Triple> {
        let mut out = Vec::new();
        for y in graph.nodes() {
            let adjacent = graph.adjacent_nodes(y);
            if adjacent.len() < 2 {
                continue;
            }
            for choice in ChoiceGenerator::new(adjacent.len(), 2) {
                let (x, z) = (adjacent[choice[0]], adjacent[choice[1]]);
                if !graph.is_adjacent(x, z) {
                    out.push(Triple::new(x, y, z));
                }
            }
        }
        out
    }

    fn orient_colliders_from_sepsets(&self, graph: &mut Graph, sepsets: &SepsetMap, report: &mut OrientationReport) {
        for triple in Self::unshielded_triples(graph) {
            match sepsets.is_in_sepset(triple.y, triple.x, triple.z) {
                Some(false) => self.try_collider(graph, triple, report),
                // y separates x and z, or the pair was removed by knowledge.
                Some(true) | None => {}
            }
        }
    }

    fn orient_colliders_conservatively<T: IndependenceTest + ?Sized>(
        &self,
        graph: &mut Graph,
        oracle: &T,
        cache: &mut TestCache,
        max_depth: usize,
        report: &mut OrientationReport,
    ) {
        let variables = graph.variables().to_vec();
        for triple in Self::unshielded_triples(graph) {
            let (mut with_y, mut without_y) = (0usize, 0usize);
            for (a, b) in [(triple.x, triple.z), (triple.z, triple.x)] {
                let pool: Vec<NodeId> = graph
                    .adjacent_nodes(a)
                    .iter()
                    .copied()
                    .filter(|&n| n != b)
                    .collect();
                for depth in 0..=pool.len().min(max_depth) {
                    for choice in ChoiceGenerator::new(pool.len(), depth) {
                        let z: SmallVec<[NodeId; 8]> = choice.iter().map(|&i| pool[i]).collect();
                        match cache.check(oracle, &variables, triple.x, triple.z, &z) {
                            Ok(outcome) if outcome.independent => {
                                if z.contains(&triple.y) {
                                    with_y += 1;
                                } else {
                                    without_y += 1;
                                }
                            }
                            Ok(_) => {}
                            Err(_) => report.oracle_failures += 1,
                        }
                    }
                }
            }

            match (with_y, without_y) {
                (0, 0) => report.ambiguous.push(triple),
                (0, _) => self.try_collider(graph, triple, report),
                (_, 0) => report.noncolliders.push(triple),
                _ => report.ambiguous.push(triple),
            }
        }
    }
}
