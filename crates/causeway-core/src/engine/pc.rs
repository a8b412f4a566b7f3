//! PC search: adjacency search followed by orientation.
//!
//! [`Pc`] wires [`Fas`] and [`OrientationEngine`] together over one oracle,
//! one knowledge object and one per-search [`TestCache`]. The graph is owned
//! by the adjacency phase, moved into the orientation phase and returned to
//! the caller; nothing outlives the call.

use std::borrow::Cow;

use crate::engine::errors::SearchError;
use crate::engine::fas::{Fas, FasConfig, FasOutcome, FasStats};
use crate::engine::graph::{Graph, NodeId, Variable};
use crate::engine::knowledge::Knowledge;
use crate::engine::oracle::{IndependenceTest, TestCache};
use crate::engine::orient::{ColliderPolicy, OrientationEngine, OrientationReport};
use crate::engine::sepset::SepsetMap;

/// Settings for a full search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PcConfig {
    pub fas: FasConfig,
    pub collider_policy: ColliderPolicy,
    /// Forces Meek R4 on or off; `None` runs it iff knowledge is non-empty.
    pub rule4: Option<bool>,
}

/// Output of a full search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The oriented pattern.
    pub graph: Graph,
    pub sepsets: SepsetMap,
    /// Pairs removed by knowledge without a test.
    pub knowledge_removed: Vec<(NodeId, NodeId)>,
    pub report: OrientationReport,
    pub stats: FasStats,
    /// Oracle calls made across both phases.
    pub total_tests: u64,
}

#[derive(Debug)]
pub struct Pc<'a, T: ?Sized> {
    oracle: &'a T,
    knowledge: Cow<'a, Knowledge>,
    config: PcConfig,
}

impl<'a, T: IndependenceTest + ?Sized> Pc<'a, T> {
    pub fn new(oracle: &'a T) -> Self {
        Self {
            oracle,
            knowledge: Cow::Owned(Knowledge::default()),
            config: PcConfig::default(),
        }
    }

    pub fn with_knowledge(mut self, knowledge: &'a Knowledge) -> Self {
        self.knowledge = Cow::Borrowed(knowledge);
        self
    }

    pub fn with_config(mut self, config: PcConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.config.fas.depth = depth;
        self
    }

    pub fn with_collider_policy(mut self, policy: ColliderPolicy) -> Self {
        self.config.collider_policy = policy;
        self
    }

    pub fn config(&self) -> &PcConfig {
        &self.config
    }

    /// Runs the adjacency search and orients its skeleton.
    pub fn search(&self, variables: &[Variable]) -> Result<SearchResult, SearchError> {
        let mut cache = TestCache::new();
        self.prepare()?;
        let outcome = self.fas().search_with_cache(variables, &mut cache)?;
        self.finish(outcome, cache)
    }

    fn fas(&self) -> Fas<'_, T> {
        Fas::new(self.oracle)
            .with_knowledge(&self.knowledge)
            .with_config(self.config.fas)
    }

    fn engine(&self) -> OrientationEngine<'_> {
        OrientationEngine::new()
            .with_knowledge(&self.knowledge)
            .with_collider_policy(self.config.collider_policy)
            .with_rule4(self.config.rule4)
            .with_depth(self.config.fas.depth)
    }

    /// Fatal preconditions, checked before any oracle call.
    fn prepare(&self) -> Result<(), SearchError> {
        self.config.fas.max_depth()?;
        self.knowledge.validate()
    }

    fn finish(&self, outcome: FasOutcome, mut cache: TestCache) -> Result<SearchResult, SearchError> {
        let FasOutcome {
            graph,
            sepsets,
            knowledge_removed,
            stats,
        } = outcome;
        let (graph, report) = self
            .engine()
            .orient_with_oracle(graph, &sepsets, self.oracle, &mut cache)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            oracle = self.oracle.name(),
            edges = graph.num_edges(),
            sepsets = sepsets.len(),
            tests = cache.misses(),
            "search complete"
        );

        Ok(SearchResult {
            graph,
            sepsets,
            knowledge_removed,
            report,
            stats,
            total_tests: cache.misses(),
        })
    }
}

#[cfg(feature = "parallel")]
impl<'a, T: IndependenceTest + Sync + ?Sized> Pc<'a, T> {
    /// Like [`search`](Self::search), with parallel adjacency-search depth passes.
    pub fn search_parallel(&self, variables: &[Variable]) -> Result<SearchResult, SearchError> {
        let mut cache = TestCache::new();
        self.prepare()?;
        let outcome = self.fas().search_parallel_with_cache(variables, &mut cache)?;
        self.finish(outcome, cache)
    }
}
