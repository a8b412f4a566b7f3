//! Background knowledge: forbidden and required orientations.
//!
//! Knowledge is expressed over variable *names*, so the same object can be
//! reused across graphs over the same variables. Two sources of constraints
//! are combined:
//!
//! - Explicit ordered pairs: `A --> B` forbidden or required.
//! - Temporal tiers: a variable in a later tier can never cause one in an
//!   earlier tier; optionally, edges within a tier are forbidden too.
//!
//! Knowledge is read-only during a search. [`Knowledge::validate`] rejects
//! self-contradictory knowledge before any search work happens.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::errors::SearchError;
use crate::engine::graph::Graph;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Knowledge {
    forbidden: BTreeSet<(String, String)>,
    required: BTreeSet<(String, String)>,
    tier_of: FxHashMap<String, usize>,
    forbidden_within: FxHashSet<usize>,
}

impl Knowledge {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no constraint of any kind has been declared.
    pub fn is_empty(&self) -> bool {
        self.forbidden.is_empty() && self.required.is_empty() && self.tier_of.is_empty()
    }

    /// Forbids the orientation `from --> to`.
    pub fn set_forbidden(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.forbidden.insert((from.into(), to.into()));
        self
    }

    pub fn remove_forbidden(&mut self, from: &str, to: &str) -> bool {
        self.forbidden.remove(&(from.to_string(), to.to_string()))
    }

    /// Requires the edge `from --> to` in the result.
    pub fn set_required(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.required.insert((from.into(), to.into()));
        self
    }

    pub fn remove_required(&mut self, from: &str, to: &str) -> bool {
        self.required.remove(&(from.to_string(), to.to_string()))
    }

    /// Places `name` in temporal tier `tier` (0 is earliest).
    pub fn add_to_tier(&mut self, tier: usize, name: impl Into<String>) -> &mut Self {
        self.tier_of.insert(name.into(), tier);
        self
    }

    /// Forbids (or re-allows) edges between two variables of the same tier.
    pub fn set_tier_forbidden_within(&mut self, tier: usize, forbidden: bool) -> &mut Self {
        if forbidden {
            self.forbidden_within.insert(tier);
        } else {
            self.forbidden_within.remove(&tier);
        }
        self
    }

    pub fn tier(&self, name: &str) -> Option<usize> {
        self.tier_of.get(name).copied()
    }

    /// True if `from --> to` may not appear in the result.
    pub fn is_forbidden(&self, from: &str, to: &str) -> bool {
        if self.forbidden.contains(&(from.to_string(), to.to_string())) {
            return true;
        }
        match (self.tier(from), self.tier(to)) {
            (Some(tf), Some(tt)) if tf > tt => true,
            (Some(tf), Some(tt)) if tf == tt => self.forbidden_within.contains(&tf),
            _ => false,
        }
    }

    /// True if `from --> to` must appear in the result.
    pub fn is_required(&self, from: &str, to: &str) -> bool {
        self.required.contains(&(from.to_string(), to.to_string()))
    }

    /// True iff neither direction between `a` and `b` is required.
    pub fn no_edge_required(&self, a: &str, b: &str) -> bool {
        !self.is_required(a, b) && !self.is_required(b, a)
    }

    /// True if both orientations are forbidden, i.e. the pair cannot be adjacent.
    pub fn is_forbidden_both_ways(&self, a: &str, b: &str) -> bool {
        self.is_forbidden(a, b) && self.is_forbidden(b, a)
    }

    /// Required edges in lexicographic order.
    pub fn required_edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.required.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Explicitly forbidden edges in lexicographic order (tier constraints excluded).
    pub fn forbidden_edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.forbidden.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Names referenced anywhere in this knowledge, sorted.
    pub fn variable_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        for (a, b) in self.forbidden.iter().chain(self.required.iter()) {
            names.insert(a.as_str());
            names.insert(b.as_str());
        }
        names.extend(self.tier_of.keys().map(String::as_str));
        names
    }

    /// Rejects knowledge that cannot be satisfied by any graph.
    ///
    /// Contradictions are:
    /// - an orientation that is both required and forbidden (explicitly or by tiers)
    /// - a pair required in both directions
    /// - required edges that form a directed cycle
    pub fn validate(&self) -> Result<(), SearchError> {
        for (from, to) in self.required_edges() {
            if self.is_forbidden(from, to) {
                return Err(SearchError::KnowledgeContradiction(format!(
                    "{from} --> {to} is both required and forbidden"
                )));
            }
            if self.is_required(to, from) {
                return Err(SearchError::KnowledgeContradiction(format!(
                    "{from} --> {to} and {to} --> {from} are both required"
                )));
            }
        }
        if let Some(cycle_node) = self.required_cycle() {
            return Err(SearchError::KnowledgeContradiction(format!(
                "required edges form a directed cycle through {cycle_node}"
            )));
        }
        Ok(())
    }

    /// Rejects knowledge mentioning names that are not variables of `graph`.
    pub fn check_names(&self, graph: &Graph) -> Result<(), SearchError> {
        for name in self.variable_names() {
            graph.require_node(name)?;
        }
        Ok(())
    }

    fn required_cycle(&self) -> Option<String> {
        let mut children: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for (from, to) in self.required_edges() {
            children.entry(from).or_default().push(to);
        }

        // 0 = unvisited, 1 = on stack, 2 = finished
        let mut state: FxHashMap<&str, u8> = FxHashMap::default();
        let mut roots: Vec<&str> = children.keys().copied().collect();
        roots.sort_unstable();

        for root in roots {
            if state.get(root).copied().unwrap_or(0) != 0 {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            state.insert(root, 1);
            while let Some((node, next_child)) = stack.pop() {
                let kids = children.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if next_child < kids.len() {
                    stack.push((node, next_child + 1));
                    let child = kids[next_child];
                    match state.get(child).copied().unwrap_or(0) {
                        0 => {
                            state.insert(child, 1);
                            stack.push((child, 0));
                        }
                        1 => return Some(child.to_string()),
                        _ => {}
                    }
                } else {
                    state.insert(node, 2);
                }
            }
        }
        None
    }
}
