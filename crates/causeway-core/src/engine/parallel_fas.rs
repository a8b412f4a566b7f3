//! Parallel depth passes for the adjacency search.
//!
//! Within one depth, every candidate pair is tested against a snapshot of
//! the adjacency map taken at the start of the pass. Tests for different
//! pairs only read the snapshot, so they run concurrently on the rayon pool.
//! Removals are then applied serially in pair order.
//!
//! ## Determinism
//!
//! Results are collected in pair order and each pair records the first
//! separating subset of its own enumeration, so the outcome is reproducible
//! for a deterministic oracle. It can differ from the sequential search,
//! where a removal shrinks the pools of pairs visited later in the same pass.
//!
//! ## Feature gating
//!
//! Behind the `parallel` feature flag. The oracle must be `Sync`.

use rayon::prelude::*;

use crate::engine::adjacency_map::AdjacencyMap;
use crate::engine::errors::SearchError;
use crate::engine::fas::{separate, Fas, FasOutcome, PoolStrategy, SearchState};
use crate::engine::graph::{NodeId, Variable};
use crate::engine::oracle::{IndependenceTest, TestCache};

/// Per-pair result of a parallel depth pass.
struct PairVerdict {
    x: NodeId,
    y: NodeId,
    sepset: Option<Vec<NodeId>>,
    failures: u64,
    cache: TestCache,
}

impl<'a, T: IndependenceTest + Sync + ?Sized> Fas<'a, T> {
    /// Runs the search with parallel depth passes and a fresh cache.
    pub fn search_parallel(&self, variables: &[Variable]) -> Result<FasOutcome, SearchError> {
        let mut cache = TestCache::new();
        self.search_parallel_with_cache(variables, &mut cache)
    }

    /// Runs the search with parallel depth passes, extending `cache`.
    pub fn search_parallel_with_cache(
        &self,
        variables: &[Variable],
        cache: &mut TestCache,
    ) -> Result<FasOutcome, SearchError> {
        self.run(variables, cache, |_, _| {}, |fas, depth, state, cache| {
            fas.parallel_depth_pass(depth, state, cache)
        })
    }

    fn parallel_depth_pass(
        &self,
        depth: usize,
        state: &mut SearchState<'_>,
        cache: &mut TestCache,
    ) -> usize {
        let snapshot: AdjacencyMap = state.adjacencies.clone();
        let candidates: Vec<(NodeId, NodeId)> = snapshot
            .pairs()
            .into_iter()
            .filter(|&(x, y)| !self.is_required_pair(state, x, y))
            .collect();

        let variables = state.variables;
        let pool_strategy = self.config.pool;
        let oracle = self.oracle;

        let verdicts: Vec<PairVerdict> = candidates
            .par_iter()
            .map(|&(x, y)| {
                let mut local = TestCache::new();
                let mut failures = 0;
                let pools = match pool_strategy {
                    PoolStrategy::Pc => vec![
                        snapshot.pool_excluding(x, y),
                        snapshot.pool_excluding(y, x),
                    ],
                    PoolStrategy::Union => vec![snapshot.union_pool(x, y)],
                };
                let mut sepset = None;
                for pool in &pools {
                    let (found, failed) = separate(oracle, variables, &mut local, x, y, pool, depth);
                    failures += failed;
                    if found.is_some() {
                        sepset = found;
                        break;
                    }
                }
                PairVerdict {
                    x,
                    y,
                    sepset,
                    failures,
                    cache: local,
                }
            })
            .collect();

        let mut removed = 0;
        for verdict in verdicts {
            state.stats.oracle_failures += verdict.failures;
            cache.merge(verdict.cache);
            if let Some(sepset) = verdict.sepset {
                state.remove(verdict.x, verdict.y, sepset);
                removed += 1;
            }
        }
        removed
    }
}
