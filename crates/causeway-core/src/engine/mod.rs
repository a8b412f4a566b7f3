//! The search engine.
//!
//! This module provides:
//! - **errors**: Error types for search failures
//! - **graph**: Mixed graph with endpoint marks, ancestry and d-separation
//! - **knowledge**: Forbidden/required orientations and temporal tiers
//! - **oracle**: The independence-test trait, per-search cache, built-in oracles
//! - **choice**: Lazy fixed-size subset enumeration
//! - **adjacency_map**: Working adjacency state of the adjacency search
//! - **sepset**: Separating sets of removed pairs
//! - **fas**: Fast adjacency search (skeleton + sepsets)
//! - **parallel_fas**: Parallel depth passes (`parallel` feature)
//! - **orient**: Knowledge, collider orientation and Meek closure
//! - **meek**: Meek orientation rules R1-R4
//! - **pc**: Full search combining both phases

pub mod adjacency_map;
pub mod choice;
pub mod errors;
pub mod fas;
pub mod graph;
pub mod knowledge;
pub mod meek;
pub mod oracle;
pub mod orient;
#[cfg(feature = "parallel")]
pub mod parallel_fas;
pub mod pc;
pub mod sepset;
