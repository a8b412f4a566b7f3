use causeway_core::engine::oracle::DSeparationOracle;
use causeway_core::metrics::{dag_to_pattern, GraphComparison, Summary};
use causeway_core::simulation::{random_dag, RandomDagConfig};
use causeway_core::Pc;
use causeway_tests::{dag, edge_strings};

#[test]
fn search_with_perfect_oracle_matches_true_pattern() {
    let truth = dag(
        &["A", "B", "C", "D", "E", "F"],
        &[("A", "C"), ("B", "C"), ("C", "D"), ("D", "E"), ("B", "F"), ("F", "E")],
    )
    .unwrap();
    let pattern = dag_to_pattern(&truth).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let result = Pc::new(&oracle).search(&variables).unwrap();
    assert_eq!(edge_strings(&result.graph), edge_strings(&pattern));

    let cmp = GraphComparison::compare(&result.graph, &pattern).unwrap();
    assert_eq!(cmp.shd, 0);
    assert_eq!(cmp.adjacency.precision(), Some(1.0));
    assert_eq!(cmp.arrowhead.recall(), Some(1.0));
}

#[test]
fn sweep_over_random_dags_recovers_patterns() {
    let mut shd = Summary::new();
    for seed in 0..20 {
        let truth = random_dag(&RandomDagConfig::new(7, 9, seed)).unwrap();
        let pattern = dag_to_pattern(&truth).unwrap();
        let variables = truth.variables().to_vec();
        let oracle = DSeparationOracle::new(truth);

        let result = Pc::new(&oracle).search(&variables).unwrap();
        let cmp = GraphComparison::compare(&result.graph, &pattern).unwrap();
        shd.push(cmp.shd as f64);
    }
    assert_eq!(shd.count(), 20);
    assert_eq!(shd.mean(), Some(0.0));
}

#[test]
fn shallow_search_is_scored_against_truth() {
    // A --> B --> C needs depth 1 to remove A --- C.
    let truth = dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    let pattern = dag_to_pattern(&truth).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let result = Pc::new(&oracle).with_depth(0).search(&variables).unwrap();
    let cmp = GraphComparison::compare(&result.graph, &pattern).unwrap();
    assert_eq!(cmp.adjacency.true_positives, 2);
    assert_eq!(cmp.adjacency.false_positives, 1);
    assert_eq!(cmp.adjacency.false_negatives, 0);
    assert_eq!(cmp.shd, 1);
}
