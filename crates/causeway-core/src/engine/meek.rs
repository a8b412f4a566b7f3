//! Meek orientation rules.
//!
//! Propagates orientations implied by the directed edges already present,
//! to a fixed point:
//!
//! - **R1**: `w --> u --- v`, `w` and `v` non-adjacent: orient `u --> v`
//!   (no new collider at `u`).
//! - **R2**: `u --> w --> v` and `u --- v`: orient `u --> v` (no cycle).
//! - **R3**: `u --- c --> v`, `u --- d --> v`, `u --- v`, `c` and `d`
//!   non-adjacent: orient `u --> v`.
//! - **R4**: `u --- c --> d --> v`, `u` adjacent to `d`, `c` and `v`
//!   non-adjacent, `u --- v`: orient `u --> v`. Only needed when background
//!   knowledge has fixed orientations, so it runs by default only when the
//!   knowledge is non-empty.
//!
//! Every orientation is checked against knowledge and refused if it would
//! close a directed cycle; a refused orientation is simply not applied in
//! that pass. Each applied orientation turns one undirected edge into a
//! directed one and nothing is ever un-oriented, so the closure terminates
//! after at most one pass per undirected edge plus a final quiet pass.
//!
//! Passes visit undirected edges in sorted pair order and try `a --> b`
//! before `b --> a`, so the result is deterministic.

use std::borrow::Cow;

use crate::engine::graph::{Graph, NodeId};
use crate::engine::knowledge::Knowledge;

/// Which rule produced an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeekRule {
    R1,
    R2,
    R3,
    R4,
}

/// One orientation applied by the closure: `from --> to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeekOrientation {
    pub from: NodeId,
    pub to: NodeId,
    pub rule: MeekRule,
}

#[derive(Debug, Clone)]
pub struct MeekRules<'k> {
    knowledge: Cow<'k, Knowledge>,
    rule4: bool,
}

impl Default for MeekRules<'_> {
    fn default() -> Self {
        Self {
            knowledge: Cow::Owned(Knowledge::default()),
            rule4: false,
        }
    }
}

impl<'k> MeekRules<'k> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `knowledge` for orientation checks; enables R4 if it is non-empty.
    pub fn with_knowledge(mut self, knowledge: &'k Knowledge) -> Self {
        self.rule4 = !knowledge.is_empty();
        self.knowledge = Cow::Borrowed(knowledge);
        self
    }

    /// Forces R4 on or off.
    pub fn with_rule4(mut self, enabled: bool) -> Self {
        self.rule4 = enabled;
        self
    }

    pub fn rule4_enabled(&self) -> bool {
        self.rule4
    }

    /// Applies R1-R4 until no rule fires. Returns the orientations in the
    /// order they were applied.
    pub fn orient_implied(&self, graph: &mut Graph) -> Vec<MeekOrientation> {
        let mut applied = Vec::new();
        loop {
            let mut changed = false;
            for edge in graph.edges() {
                if !edge.is_undirected() {
                    continue;
                }
                let (a, b) = (edge.node1, edge.node2);
                for (from, to) in [(a, b), (b, a)] {
                    if !graph.is_undirected(from, to) {
                        break;
                    }
                    let Some(rule) = self.implied_rule(graph, from, to) else {
                        continue;
                    };
                    if self.can_orient(graph, from, to) {
                        graph.orient(from, to);
                        applied.push(MeekOrientation { from, to, rule });
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(orientations = applied.len(), rule4 = self.rule4, "meek closure reached fixed point");

        applied
    }

    /// True if `from --> to` is allowed by knowledge and keeps the graph acyclic.
    pub fn can_orient(&self, graph: &Graph, from: NodeId, to: NodeId) -> bool {
        let (f, t) = (graph.name(from), graph.name(to));
        !self.knowledge.is_forbidden(f, t)
            && !self.knowledge.is_required(t, f)
            && !graph.would_create_cycle(from, to)
    }

    /// First rule (in R1..R4 order) that implies `u --> v` for the undirected `u --- v`.
    fn implied_rule(&self, graph: &Graph, u: NodeId, v: NodeId) -> Option<MeekRule> {
        if r1(graph, u, v) {
            Some(MeekRule::R1)
        } else if r2(graph, u, v) {
            Some(MeekRule::R2)
        } else if r3(graph, u, v) {
            Some(MeekRule::R3)
        } else if self.rule4 && r4(graph, u, v) {
            Some(MeekRule::R4)
        } else {
            None
        }
    }
}

fn r1(graph: &Graph, u: NodeId, v: NodeId) -> bool {
    graph
        .adjacent_nodes(u)
        .iter()
        .any(|&w| w != v && graph.is_directed_from_to(w, u) && !graph.is_adjacent(w, v))
}

fn r2(graph: &Graph, u: NodeId, v: NodeId) -> bool {
    graph
        .adjacent_nodes(u)
        .iter()
        .any(|&w| w != v && graph.is_directed_from_to(u, w) && graph.is_directed_from_to(w, v))
}

fn r3(graph: &Graph, u: NodeId, v: NodeId) -> bool {
    let candidates: Vec<NodeId> = graph
        .adjacent_nodes(u)
        .iter()
        .copied()
        .filter(|&c| c != v && graph.is_undirected(u, c) && graph.is_directed_from_to(c, v))
        .collect();
    candidates.iter().enumerate().any(|(i, &c)| {
        candidates[i + 1..]
            .iter()
            .any(|&d| !graph.is_adjacent(c, d))
    })
}

fn r4(graph: &Graph, u: NodeId, v: NodeId) -> bool {
    graph.adjacent_nodes(v).iter().any(|&d| {
        d != u
            && graph.is_directed_from_to(d, v)
            && graph.is_adjacent(u, d)
            && graph.adjacent_nodes(d).iter().any(|&c| {
                c != u
                    && c != v
                    && graph.is_directed_from_to(c, d)
                    && graph.is_undirected(u, c)
                    && !graph.is_adjacent(c, v)
            })
    })
}
