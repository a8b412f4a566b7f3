use causeway_core::engine::fas::Fas;
use causeway_core::engine::meek::MeekRule;
use causeway_core::engine::oracle::{DSeparationOracle, IndependenceFacts};
use causeway_core::engine::orient::Triple;
use causeway_core::{
    ColliderPolicy, IndependenceTest, OracleError, Pc, PoolStrategy, SearchError, TestOutcome,
    Variable,
};
use causeway_tests::{dag, edge_strings, node, vars};

#[test]
fn collider_is_oriented_from_empty_sepset() {
    let mut facts = IndependenceFacts::new();
    facts.add_parsed("A _||_ C").unwrap();

    let result = Pc::new(&facts).search(&vars(&["A", "B", "C"])).unwrap();
    let g = &result.graph;
    let (a, b, c) = (node(g, "A"), node(g, "B"), node(g, "C"));

    assert_eq!(edge_strings(g), vec!["A --> B", "B <-- C"]);
    assert!(g.is_directed_from_to(a, b));
    assert!(g.is_directed_from_to(c, b));
    assert_eq!(result.sepsets.get(a, c), Some(&[][..]));
    assert_eq!(result.report.colliders, vec![Triple::new(a, b, c)]);
    assert!(result.report.meek.is_empty());
}

#[test]
fn chain_stays_undirected() {
    let mut facts = IndependenceFacts::new();
    facts.add_parsed("A _||_ C | B").unwrap();

    let result = Pc::new(&facts).search(&vars(&["A", "B", "C"])).unwrap();
    let g = &result.graph;
    let (a, b, c) = (node(g, "A"), node(g, "B"), node(g, "C"));

    assert_eq!(edge_strings(g), vec!["A --- B", "B --- C"]);
    assert_eq!(result.sepsets.get(a, c), Some(&[b][..]));
    assert!(result.report.colliders.is_empty());
    assert_eq!(result.stats.removed_by_depth[..2], [0, 1]);
    assert_eq!(result.stats.removed_by_depth.iter().sum::<usize>(), 1);
}

#[test]
fn chain_of_four_stays_undirected() {
    let mut facts = IndependenceFacts::new();
    for fact in ["A _||_ C | B", "B _||_ D | C", "A _||_ D | B", "A _||_ D | C"] {
        facts.add_parsed(fact).unwrap();
    }

    let result = Pc::new(&facts).search(&vars(&["A", "B", "C", "D"])).unwrap();
    let g = &result.graph;
    let (a, b, c, d) = (node(g, "A"), node(g, "B"), node(g, "C"), node(g, "D"));

    assert_eq!(edge_strings(g), vec!["A --- B", "B --- C", "C --- D"]);
    assert!(result.report.colliders.is_empty());
    assert!(result.report.meek.is_empty());
    assert_eq!(result.sepsets.len(), 3);
    assert_eq!(result.sepsets.get(a, c), Some(&[b][..]));
    assert_eq!(result.sepsets.get(a, d), Some(&[b][..]));
    assert_eq!(result.sepsets.get(b, d), Some(&[c][..]));
}

#[test]
fn meek_propagates_below_collider() {
    let truth = dag(&["A", "B", "C", "D"], &[("A", "C"), ("B", "C"), ("C", "D")]).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let result = Pc::new(&oracle).search(&variables).unwrap();
    let g = &result.graph;
    let (c, d) = (node(g, "C"), node(g, "D"));

    assert_eq!(edge_strings(g), vec!["A --> C", "B --> C", "C --> D"]);
    assert_eq!(result.report.meek.len(), 1);
    assert_eq!(result.report.meek[0].rule, MeekRule::R1);
    assert_eq!((result.report.meek[0].from, result.report.meek[0].to), (c, d));
}

#[test]
fn depth_bound_limits_conditioning() {
    let truth = dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let shallow = Fas::new(&oracle).with_depth(0).search(&variables).unwrap();
    assert_eq!(shallow.graph.num_edges(), 3);
    assert_eq!(shallow.stats.depth_reached(), Some(0));

    let full = Fas::new(&oracle).search(&variables).unwrap();
    assert_eq!(full.graph.num_edges(), 2);
}

#[test]
fn union_pool_finds_the_same_skeleton() {
    let truth = dag(
        &["A", "B", "C", "D", "E"],
        &[("A", "B"), ("B", "C"), ("B", "D"), ("C", "E"), ("D", "E")],
    )
    .unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let pc = Fas::new(&oracle).search(&variables).unwrap();
    let mut config = *Fas::new(&oracle).config();
    config.pool = PoolStrategy::Union;
    let union = Fas::new(&oracle).with_config(config).search(&variables).unwrap();

    assert_eq!(pc.graph.edges(), union.graph.edges());
    assert_eq!(pc.graph.num_edges(), 5);
}

/// d-separation, except that any question about `{A, C}` fails.
struct FlakyOracle(DSeparationOracle);

impl IndependenceTest for FlakyOracle {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        let pair = [x.name(), y.name()];
        if pair.contains(&"A") && pair.contains(&"C") {
            return Err(OracleError::Failed("simulated".into()));
        }
        self.0.test(x, y, z)
    }
}

#[test]
fn oracle_errors_count_as_dependence() {
    let truth = dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = FlakyOracle(DSeparationOracle::new(truth));

    let result = Pc::new(&oracle).search(&variables).unwrap();
    let g = &result.graph;
    assert!(g.is_adjacent(node(g, "A"), node(g, "C")));
    assert_eq!(g.num_edges(), 3);
    assert!(result.stats.oracle_failures >= 2);
    assert!(result.sepsets.is_empty());
}

#[test]
fn conservative_policy_splits_colliders_and_noncolliders() {
    // A --> C <-- B, C --> D
    let truth = dag(&["A", "B", "C", "D"], &[("A", "C"), ("B", "C"), ("C", "D")]).unwrap();
    let variables = truth.variables().to_vec();
    let oracle = DSeparationOracle::new(truth);

    let result = Pc::new(&oracle)
        .with_collider_policy(ColliderPolicy::Conservative)
        .search(&variables)
        .unwrap();
    let g = &result.graph;
    let (a, b, c, d) = (node(g, "A"), node(g, "B"), node(g, "C"), node(g, "D"));

    assert_eq!(result.report.colliders, vec![Triple::new(a, c, b)]);
    assert!(result.report.noncolliders.contains(&Triple::new(a, c, d)));
    assert!(result.report.noncolliders.contains(&Triple::new(b, c, d)));
    assert!(result.report.ambiguous.is_empty());
    assert!(g.is_directed_from_to(c, d));
}

#[test]
fn duplicate_variable_is_rejected() {
    let facts = IndependenceFacts::new();
    let err = Pc::new(&facts).search(&vars(&["A", "A"])).unwrap_err();
    assert!(matches!(err, SearchError::DuplicateVariable(name) if name == "A"));
}

#[test]
fn trivial_variable_sets() {
    let facts = IndependenceFacts::new();
    let empty = Pc::new(&facts).search(&[]).unwrap();
    assert_eq!(empty.graph.num_nodes(), 0);

    let single = Pc::new(&facts).search(&vars(&["A"])).unwrap();
    assert_eq!(single.graph.num_edges(), 0);
    assert_eq!(single.total_tests, 0);
    assert_eq!(facts.calls(), 0);
}

#[test]
fn everything_dependent_leaves_complete_undirected_graph() {
    let facts = IndependenceFacts::new();
    let result = Pc::new(&facts).search(&vars(&["A", "B", "C", "D"])).unwrap();
    assert_eq!(result.graph.num_edges(), 6);
    assert!(result.graph.edges().iter().all(|e| e.is_undirected()));
    assert!(result.sepsets.is_empty());
}

#[test]
fn convenience_search_matches_builder() {
    let mut facts = IndependenceFacts::new();
    facts.add_parsed("A _||_ C").unwrap();
    let variables = vars(&["A", "B", "C"]);

    let knowledge = causeway_core::Knowledge::new();
    let a = causeway_core::search(&variables, &facts, &knowledge).unwrap();
    let b = Pc::new(&facts).search(&variables).unwrap();
    assert_eq!(a.graph.edges(), b.graph.edges());
    assert_eq!(a.sepsets, b.sepsets);
}
