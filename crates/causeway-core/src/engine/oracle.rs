//! Independence-test oracles.
//!
//! The search core only ever sees the [`IndependenceTest`] trait. Concrete
//! tests (Fisher-Z, chi-square, Bayesian tests) live outside this crate and
//! are supplied by the caller; this module ships the two oracles that need no
//! data:
//!
//! - [`DSeparationOracle`]: answers by d-separation in a known DAG
//! - [`IndependenceFacts`]: answers from a table of declared independences
//!
//! [`TestCache`] memoizes verdicts for the duration of one search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::engine::errors::{OracleError, SearchError};
use crate::engine::graph::{Graph, NodeId, Variable};

/// Verdict of one conditional independence test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub independent: bool,
    pub p_value: f64,
}

impl TestOutcome {
    pub fn independent(p_value: f64) -> Self {
        Self {
            independent: true,
            p_value,
        }
    }

    pub fn dependent(p_value: f64) -> Self {
        Self {
            independent: false,
            p_value,
        }
    }
}

/// A conditional independence test `x _||_ y | z`.
///
/// Implementations may be expensive and may sample internally; the search
/// accepts one verdict per call and never retries.
pub trait IndependenceTest {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError>;

    /// Short name for logs and reports.
    fn name(&self) -> &str {
        "independence test"
    }
}

impl<T: IndependenceTest + ?Sized> IndependenceTest for &T {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        (**self).test(x, y, z)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: IndependenceTest + ?Sized> IndependenceTest for Box<T> {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        (**self).test(x, y, z)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: IndependenceTest + ?Sized> IndependenceTest for Arc<T> {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        (**self).test(x, y, z)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

type ConditioningKey = SmallVec<[NodeId; 8]>;

/// Memoized verdicts for one search invocation.
///
/// Keys are `(unordered pair, sorted conditioning set)`, so the question
/// `x _||_ y | {a, b}` asked from either side of the pair, in any set order,
/// reaches the oracle once. Oracle failures are cached too.
#[derive(Debug, Clone, Default)]
pub struct TestCache {
    entries: FxHashMap<(NodeId, NodeId, ConditioningKey), Result<TestOutcome, OracleError>>,
    hits: u64,
    misses: u64,
}

impl TestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `x _||_ y | z`, consulting `oracle` only on a cache miss.
    pub fn check<T: IndependenceTest + ?Sized>(
        &mut self,
        oracle: &T,
        variables: &[Variable],
        x: NodeId,
        y: NodeId,
        z: &[NodeId],
    ) -> Result<TestOutcome, OracleError> {
        let mut set: ConditioningKey = z.iter().copied().collect();
        set.sort_unstable();
        let key = if x <= y { (x, y, set) } else { (y, x, set) };

        if let Some(cached) = self.entries.get(&key) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let result = run_test(oracle, variables, x, y, z);
        self.entries.insert(key, result.clone());
        result
    }

    /// Oracle calls avoided.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Oracle calls made.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds entries and counters of `other` into `self`.
    pub fn merge(&mut self, other: TestCache) {
        self.hits += other.hits;
        self.misses += other.misses;
        for (key, value) in other.entries {
            self.entries.entry(key).or_insert(value);
        }
    }
}

/// Invokes the oracle with variables resolved from node ids.
pub fn run_test<T: IndependenceTest + ?Sized>(
    oracle: &T,
    variables: &[Variable],
    x: NodeId,
    y: NodeId,
    z: &[NodeId],
) -> Result<TestOutcome, OracleError> {
    let conditioning: SmallVec<[Variable; 8]> =
        z.iter().map(|n| variables[n.index()].clone()).collect();
    oracle.test(&variables[x.index()], &variables[y.index()], &conditioning)
}

/// Independence by d-separation in a known DAG.
///
/// Variables are matched to the DAG's nodes by name. Independent verdicts
/// carry p-value 1.0, dependent ones 0.0.
#[derive(Debug)]
pub struct DSeparationOracle {
    dag: Graph,
    calls: AtomicU64,
}

impl DSeparationOracle {
    /// Wraps `dag`. Only its directed edges are used.
    pub fn new(dag: Graph) -> Self {
        Self {
            dag,
            calls: AtomicU64::new(0),
        }
    }

    pub fn dag(&self) -> &Graph {
        &self.dag
    }

    /// Number of `test` calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn resolve(&self, var: &Variable) -> Result<NodeId, OracleError> {
        self.dag
            .node_id(var.name())
            .ok_or_else(|| OracleError::UnknownVariable(var.name().to_string()))
    }
}

impl IndependenceTest for DSeparationOracle {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let xi = self.resolve(x)?;
        let yi = self.resolve(y)?;
        let zi = z
            .iter()
            .map(|v| self.resolve(v))
            .collect::<Result<SmallVec<[NodeId; 8]>, _>>()?;
        if self.dag.is_d_separated(xi, yi, &zi) {
            Ok(TestOutcome::independent(1.0))
        } else {
            Ok(TestOutcome::dependent(0.0))
        }
    }

    fn name(&self) -> &str {
        "d-separation"
    }
}

/// Independence from a table of declared facts.
///
/// A fact `x _||_ y | z` is symmetric in `x`, `y` and insensitive to the
/// order of `z`. Anything not declared is reported dependent.
#[derive(Debug, Default)]
pub struct IndependenceFacts {
    facts: FxHashSet<(String, String, Vec<String>)>,
    calls: AtomicU64,
}

impl IndependenceFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `x _||_ y | z`.
    pub fn add<S: AsRef<str>>(&mut self, x: &str, y: &str, z: &[S]) -> &mut Self {
        self.facts.insert(Self::key(x, y, z.iter().map(AsRef::as_ref)));
        self
    }

    /// Parses and declares a fact written `X _||_ Y | Z1, Z2` (the `| ...`
    /// part is optional).
    pub fn add_parsed(&mut self, fact: &str) -> Result<&mut Self, SearchError> {
        let (x, rest) = fact
            .split_once("_||_")
            .ok_or_else(|| SearchError::Format(format!("expected 'X _||_ Y | Z' in '{fact}'")))?;
        let (y, conditioning) = match rest.split_once('|') {
            Some((y, z)) => (y, Some(z)),
            None => (rest, None),
        };
        let (x, y) = (x.trim(), y.trim());
        if x.is_empty() || y.is_empty() {
            return Err(SearchError::Format(format!("missing variable in '{fact}'")));
        }
        let z: Vec<&str> = conditioning
            .map(|rest| {
                rest.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(self.add(x, y, &z))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn key<'a>(x: &str, y: &str, z: impl Iterator<Item = &'a str>) -> (String, String, Vec<String>) {
        let mut z: Vec<String> = z.map(str::to_string).collect();
        z.sort_unstable();
        z.dedup();
        if x <= y {
            (x.to_string(), y.to_string(), z)
        } else {
            (y.to_string(), x.to_string(), z)
        }
    }
}

impl IndependenceTest for IndependenceFacts {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let key = Self::key(x.name(), y.name(), z.iter().map(Variable::name));
        if self.facts.contains(&key) {
            Ok(TestOutcome::independent(1.0))
        } else {
            Ok(TestOutcome::dependent(0.0))
        }
    }

    fn name(&self) -> &str {
        "independence facts"
    }
}
