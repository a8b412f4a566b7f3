//! # Causeway Core
//!
//! Constraint-based causal structure search: the fast adjacency search with
//! sepset bookkeeping, and the orientation pass (knowledge, unshielded
//! colliders, Meek rules) that turns its skeleton into a pattern.
//!
//! ## Usage
//!
//! ```rust
//! use causeway_core::engine::graph::Variable;
//! use causeway_core::engine::oracle::IndependenceFacts;
//! use causeway_core::Pc;
//!
//! let mut facts = IndependenceFacts::new();
//! facts.add_parsed("A _||_ C").unwrap();
//!
//! let vars = ["A", "B", "C"].map(Variable::continuous);
//! let result = Pc::new(&facts).search(&vars).unwrap();
//! // A --> B <-- C
//! assert_eq!(result.report.colliders.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod engine;
pub mod metrics;
pub mod simulation;
#[cfg(feature = "serde")]
pub mod storage;

// Re-export commonly used types
pub use engine::errors::{OracleError, SearchError};
pub use engine::fas::{Fas, FasConfig, PoolStrategy};
pub use engine::graph::{Endpoint, Graph, NodeId, Variable, VariableKind};
pub use engine::knowledge::Knowledge;
pub use engine::oracle::{IndependenceTest, TestOutcome};
pub use engine::orient::{ColliderPolicy, OrientationEngine};
pub use engine::pc::{Pc, PcConfig, SearchResult};
pub use engine::sepset::SepsetMap;

/// Runs a default PC search (unbounded depth, sepset colliders) over
/// `variables` with `oracle` and `knowledge`.
pub fn search<T: IndependenceTest + ?Sized>(
    variables: &[Variable],
    oracle: &T,
    knowledge: &Knowledge,
) -> Result<SearchResult, SearchError> {
    Pc::new(oracle).with_knowledge(knowledge).search(variables)
}
