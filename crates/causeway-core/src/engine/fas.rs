//! Fast adjacency search.
//!
//! Prunes the complete graph over a variable set by conditional independence
//! tests, indexed by conditioning-set size:
//!
//! 1. Start from the complete graph; drop pairs that knowledge forbids in
//!    both directions (no test, no sepset).
//! 2. For `depth = 0, 1, ...`: for each adjacent pair not required by
//!    knowledge, enumerate `depth`-subsets of the conditioning pool in
//!    lexicographic order. The first subset judged independent removes the
//!    edge and becomes the pair's sepset.
//! 3. Stop after the requested depth, or once no node has more than `depth`
//!    neighbours.
//!
//! ## Determinism
//!
//! Pairs are visited in `NodeId` order and subsets in lexicographic order,
//! so with a deterministic oracle the skeleton and the recorded sepsets are
//! reproducible. When several subsets separate a pair, the first one in
//! enumeration order is recorded.
//!
//! ## Failure policy
//!
//! An oracle error counts as a "dependent" verdict for that one subset. It
//! is logged and counted in [`FasStats::oracle_failures`], never propagated.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::engine::adjacency_map::AdjacencyMap;
use crate::engine::choice::ChoiceGenerator;
use crate::engine::errors::SearchError;
use crate::engine::graph::{Graph, NodeId, Variable};
use crate::engine::knowledge::Knowledge;
use crate::engine::oracle::{IndependenceTest, TestCache};
use crate::engine::sepset::SepsetMap;

/// Depth used when the caller asks for an unbounded search (`depth == -1`).
pub const MAX_SEARCH_DEPTH: usize = 1000;

/// Which nodes may appear in a separating set for `{x, y}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PoolStrategy {
    /// `adj(x) \ {y}`, then `adj(y) \ {x}`: the standard PC adjacency phase.
    #[default]
    Pc,
    /// `(adj(x) \ {y}) ∪ (adj(y) \ {x})` as a single pool.
    Union,
}

/// Adjacency search settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FasConfig {
    /// Largest conditioning-set size to try; `-1` for unbounded.
    pub depth: i32,
    pub pool: PoolStrategy,
}

impl Default for FasConfig {
    fn default() -> Self {
        Self {
            depth: -1,
            pool: PoolStrategy::Pc,
        }
    }
}

impl FasConfig {
    /// Validated depth bound; `-1` maps to [`MAX_SEARCH_DEPTH`].
    pub fn max_depth(&self) -> Result<usize, SearchError> {
        match self.depth {
            -1 => Ok(MAX_SEARCH_DEPTH),
            d if d < -1 => Err(SearchError::InvalidDepth(d)),
            d => Ok((d as usize).min(MAX_SEARCH_DEPTH)),
        }
    }
}

/// Counters collected during one adjacency search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FasStats {
    /// Oracle invocations (cache misses).
    pub tests_run: u64,
    /// Questions answered from the per-search cache.
    pub cache_hits: u64,
    /// Oracle calls that returned an error and were treated as dependent.
    pub oracle_failures: u64,
    /// Edges removed at each depth, indexed by depth.
    pub removed_by_depth: Vec<usize>,
    /// Pairs removed up front because knowledge forbids both directions.
    pub knowledge_removed: usize,
}

impl FasStats {
    /// Deepest depth that was processed.
    pub fn depth_reached(&self) -> Option<usize> {
        self.removed_by_depth.len().checked_sub(1)
    }
}

/// Result of an adjacency search.
#[derive(Debug, Clone)]
pub struct FasOutcome {
    /// Undirected skeleton (every edge `Tail`-`Tail`).
    pub graph: Graph,
    /// Separating set of every pair removed by an independence verdict.
    pub sepsets: SepsetMap,
    /// Pairs removed by knowledge alone; these have no sepset.
    pub knowledge_removed: Vec<(NodeId, NodeId)>,
    pub stats: FasStats,
}

/// Fast adjacency search over an independence oracle.
#[derive(Debug)]
pub struct Fas<'a, T: ?Sized> {
    pub(crate) oracle: &'a T,
    pub(crate) knowledge: Cow<'a, Knowledge>,
    pub(crate) config: FasConfig,
}

impl<'a, T: IndependenceTest + ?Sized> Fas<'a, T> {
    pub fn new(oracle: &'a T) -> Self {
        Self {
            oracle,
            knowledge: Cow::Owned(Knowledge::default()),
            config: FasConfig::default(),
        }
    }

    pub fn with_knowledge(mut self, knowledge: &'a Knowledge) -> Self {
        self.knowledge = Cow::Borrowed(knowledge);
        self
    }

    pub fn with_config(mut self, config: FasConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the depth bound (`-1` for unbounded). Validated at search time.
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.config.depth = depth;
        self
    }

    pub fn config(&self) -> &FasConfig {
        &self.config
    }

    /// Runs the search with a fresh per-search cache.
    pub fn search(&self, variables: &[Variable]) -> Result<FasOutcome, SearchError> {
        let mut cache = TestCache::new();
        self.search_with_cache(variables, &mut cache)
    }

    /// Runs the search, reusing and extending `cache`.
    pub fn search_with_cache(
        &self,
        variables: &[Variable],
        cache: &mut TestCache,
    ) -> Result<FasOutcome, SearchError> {
        self.search_with_observer(variables, cache, |_, _| {})
    }

    /// Runs the search and calls `observer(depth, adjacencies)` after each depth.
    pub fn search_with_observer<F>(
        &self,
        variables: &[Variable],
        cache: &mut TestCache,
        observer: F,
    ) -> Result<FasOutcome, SearchError>
    where
        F: FnMut(usize, &AdjacencyMap),
    {
        self.run(variables, cache, observer, |fas, depth, state, cache| {
            fas.depth_pass(depth, state, cache)
        })
    }

    /// Shared driver for the sequential and parallel depth passes.
    pub(crate) fn run<F, P>(
        &self,
        variables: &[Variable],
        cache: &mut TestCache,
        mut observer: F,
        mut pass: P,
    ) -> Result<FasOutcome, SearchError>
    where
        F: FnMut(usize, &AdjacencyMap),
        P: FnMut(&Self, usize, &mut SearchState<'_>, &mut TestCache) -> usize,
    {
        let max_depth = self.config.max_depth()?;
        let template = Graph::new(variables.to_vec())?;
        self.knowledge.validate()?;
        self.knowledge.check_names(&template)?;

        let hits_before = cache.hits();
        let misses_before = cache.misses();

        let mut state = SearchState {
            variables,
            adjacencies: AdjacencyMap::complete(variables.len()),
            sepsets: SepsetMap::new(),
            stats: FasStats::default(),
        };

        let mut knowledge_removed = Vec::new();
        for (x, y) in state.adjacencies.pairs() {
            let (xn, yn) = (variables[x.index()].name(), variables[y.index()].name());
            if self.knowledge.is_forbidden_both_ways(xn, yn) && self.knowledge.no_edge_required(xn, yn) {
                state.adjacencies.remove(x, y);
                knowledge_removed.push((x, y));
            }
        }
        state.stats.knowledge_removed = knowledge_removed.len();

        let mut depth = 0;
        while depth <= max_depth {
            let removed = pass(self, depth, &mut state, cache);
            state.stats.removed_by_depth.push(removed);
            observer(depth, &state.adjacencies);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                depth,
                removed,
                remaining = state.adjacencies.num_edges(),
                "adjacency search depth complete"
            );

            if state.adjacencies.max_degree() <= depth {
                break;
            }
            depth += 1;
        }

        state.stats.tests_run = cache.misses() - misses_before;
        state.stats.cache_hits = cache.hits() - hits_before;

        let SearchState {
            adjacencies,
            sepsets,
            stats,
            ..
        } = state;
        Ok(FasOutcome {
            graph: adjacencies.to_graph(&template),
            sepsets,
            knowledge_removed,
            stats,
        })
    }

    /// One sequential pass at `depth`. Removals take effect immediately, so
    /// later pairs in the same pass see the smaller pools.
    fn depth_pass(&self, depth: usize, state: &mut SearchState<'_>, cache: &mut TestCache) -> usize {
        let mut removed = 0;
        match self.config.pool {
            PoolStrategy::Pc => {
                for x in (0..state.variables.len() as u32).map(NodeId) {
                    let neighbours: SmallVec<[NodeId; 16]> =
                        state.adjacencies.adjacent(x).iter().copied().collect();
                    for y in neighbours {
                        if !state.adjacencies.is_adjacent(x, y) || self.is_required_pair(state, x, y) {
                            continue;
                        }
                        let pool = state.adjacencies.pool_excluding(x, y);
                        if let Some(sepset) = self.find_sepset(state, cache, x, y, &pool, depth) {
                            state.remove(x, y, sepset);
                            removed += 1;
                        }
                    }
                }
            }
            PoolStrategy::Union => {
                for (x, y) in state.adjacencies.pairs() {
                    if !state.adjacencies.is_adjacent(x, y) || self.is_required_pair(state, x, y) {
                        continue;
                    }
                    let pool = state.adjacencies.union_pool(x, y);
                    if let Some(sepset) = self.find_sepset(state, cache, x, y, &pool, depth) {
                        state.remove(x, y, sepset);
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    pub(crate) fn is_required_pair(&self, state: &SearchState<'_>, x: NodeId, y: NodeId) -> bool {
        !self
            .knowledge
            .no_edge_required(state.name(x), state.name(y))
    }

    /// First `depth`-subset of `pool` that separates `x` and `y`.
    pub(crate) fn find_sepset(
        &self,
        state: &mut SearchState<'_>,
        cache: &mut TestCache,
        x: NodeId,
        y: NodeId,
        pool: &[NodeId],
        depth: usize,
    ) -> Option<Vec<NodeId>> {
        let (sepset, failures) = separate(self.oracle, state.variables, cache, x, y, pool, depth);
        state.stats.oracle_failures += failures;
        sepset
    }
}

/// Enumerates `depth`-subsets of `pool` until one separates `x` and `y`.
///
/// Returns the separating set (if any) and the number of oracle failures
/// seen along the way.
pub(crate) fn separate<T: IndependenceTest + ?Sized>(
    oracle: &T,
    variables: &[Variable],
    cache: &mut TestCache,
    x: NodeId,
    y: NodeId,
    pool: &[NodeId],
    depth: usize,
) -> (Option<Vec<NodeId>>, u64) {
    let mut failures = 0;
    if pool.len() < depth {
        return (None, failures);
    }
    for choice in ChoiceGenerator::new(pool.len(), depth) {
        let z: SmallVec<[NodeId; 8]> = choice.iter().map(|&i| pool[i]).collect();
        match cache.check(oracle, variables, x, y, &z) {
            Ok(outcome) if outcome.independent => return (Some(z.to_vec()), failures),
            Ok(_) => {}
            Err(_err) => {
                failures += 1;
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    x = variables[x.index()].name(),
                    y = variables[y.index()].name(),
                    error = %_err,
                    "independence test failed; treating pair as dependent"
                );
            }
        }
    }
    (None, failures)
}

/// Mutable state owned by one search invocation.
#[derive(Debug)]
pub(crate) struct SearchState<'v> {
    pub(crate) variables: &'v [Variable],
    pub(crate) adjacencies: AdjacencyMap,
    pub(crate) sepsets: SepsetMap,
    pub(crate) stats: FasStats,
}

impl SearchState<'_> {
    pub(crate) fn name(&self, node: NodeId) -> &str {
        self.variables[node.index()].name()
    }

    pub(crate) fn remove(&mut self, x: NodeId, y: NodeId, sepset: Vec<NodeId>) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            x = self.name(x),
            y = self.name(y),
            sepset = ?sepset.iter().map(|n| self.name(*n)).collect::<Vec<_>>(),
            "removed edge"
        );
        self.adjacencies.remove(x, y);
        self.sepsets.set(x, y, sepset);
    }
}
