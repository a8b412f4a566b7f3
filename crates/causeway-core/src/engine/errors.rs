//! Error types for causeway searches.

use thiserror::Error;

/// Errors that abort a search, an orientation pass, or a storage operation.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Only global contract violations end up here. Per-pair and per-triple
/// failures (oracle errors, cycle-blocked orientations, ambiguous triples)
/// are contained inside the search loops and show up in statistics and
/// reports instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SearchError {
    /// Search depth below -1.
    #[error("invalid search depth {0} (expected -1 for unbounded, or >= 0)")]
    InvalidDepth(i32),

    /// The same variable name appears twice in the input variable set.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// A name referenced by knowledge or a model file is not a known variable.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Background knowledge both requires and forbids an orientation, or
    /// requires a directed cycle.
    #[error("contradictory knowledge: {0}")]
    KnowledgeContradiction(String),

    /// A combination of settings that cannot run (e.g. a policy that needs
    /// an oracle, invoked without one).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a model or graph file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A model or graph file is malformed.
    #[error("format error: {0}")]
    Format(String),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure of a single independence test.
///
/// The adjacency search never propagates these: the pair under test is
/// treated as dependent and the failure is counted.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// Covariance submatrix for the conditioning set could not be inverted.
    #[error("singular matrix testing {x} _||_ {y}")]
    SingularMatrix { x: String, y: String },

    /// Too few samples for the size of the conditioning set.
    #[error("negative degrees of freedom ({0})")]
    NegativeDegreesOfFreedom(i64),

    /// A variable passed to the oracle is not one it knows about.
    #[error("oracle does not know variable '{0}'")]
    UnknownVariable(String),

    /// Any other oracle-specific failure.
    #[error("independence test failed: {0}")]
    Failed(String),
}
