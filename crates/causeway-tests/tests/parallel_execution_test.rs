//! Parallel depth passes against the sequential search.
//!
//! Run with: cargo test -p causeway-tests --features parallel

#![cfg(feature = "parallel")]

use causeway_core::engine::oracle::DSeparationOracle;
use causeway_core::simulation::{random_dag, RandomDagConfig};
use causeway_core::{Fas, Pc};

#[test]
fn parallel_and_sequential_agree_under_perfect_oracle() {
    for seed in 0..25 {
        let truth = random_dag(&RandomDagConfig::new(8, 12, seed)).unwrap();
        let variables = truth.variables().to_vec();
        let oracle = DSeparationOracle::new(truth);

        let sequential = Pc::new(&oracle).search(&variables).unwrap();
        let parallel = Pc::new(&oracle).search_parallel(&variables).unwrap();
        assert_eq!(
            sequential.graph.edges(),
            parallel.graph.edges(),
            "seed {seed}: patterns differ"
        );
    }
}

#[test]
fn parallel_runs_are_reproducible() {
    let truth = random_dag(&RandomDagConfig::new(10, 18, 7)).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let first = Fas::new(&oracle).search_parallel(&variables).unwrap();
    let second = Fas::new(&oracle).search_parallel(&variables).unwrap();
    assert_eq!(first.sepsets, second.sepsets);
    assert_eq!(first.stats.removed_by_depth, second.stats.removed_by_depth);
}
