//! Separating sets recorded during the adjacency search.

use rustc_hash::FxHashMap;

use crate::engine::graph::{Graph, NodeId};

/// Conditioning sets that rendered removed pairs independent.
///
/// Keys are unordered pairs. Only pairs whose edge was removed by an
/// independence verdict have an entry, and the first recorded set is kept:
/// later `set` calls for the same pair are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SepsetMap {
    sets: FxHashMap<(NodeId, NodeId), Vec<NodeId>>,
}

#[inline]
fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl SepsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `sepset` for `{a, b}` unless one is already present.
    ///
    /// Returns `true` if the set was recorded.
    pub fn set(&mut self, a: NodeId, b: NodeId, sepset: Vec<NodeId>) -> bool {
        match self.sets.entry(key(a, b)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(sepset);
                true
            }
        }
    }

    pub fn get(&self, a: NodeId, b: NodeId) -> Option<&[NodeId]> {
        self.sets.get(&key(a, b)).map(Vec::as_slice)
    }

    pub fn contains_pair(&self, a: NodeId, b: NodeId) -> bool {
        self.sets.contains_key(&key(a, b))
    }

    /// True if `node` is in the recorded sepset of `{a, b}`.
    ///
    /// `None` when the pair has no recorded sepset.
    pub fn is_in_sepset(&self, node: NodeId, a: NodeId, b: NodeId) -> Option<bool> {
        self.get(a, b).map(|set| set.contains(&node))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Entries sorted by pair.
    pub fn entries(&self) -> Vec<((NodeId, NodeId), &[NodeId])> {
        let mut out: Vec<_> = self
            .sets
            .iter()
            .map(|(pair, set)| (*pair, set.as_slice()))
            .collect();
        out.sort_unstable_by_key(|(pair, _)| *pair);
        out
    }

    /// Human-readable `{A, C} | {B}` lines, using `graph` for names.
    pub fn describe(&self, graph: &Graph) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|((a, b), set)| {
                let names: Vec<&str> = set.iter().map(|&n| graph.name(n)).collect();
                format!(
                    "{{{}, {}}} | {{{}}}",
                    graph.name(a),
                    graph.name(b),
                    names.join(", ")
                )
            })
            .collect()
    }
}
