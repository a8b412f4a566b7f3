use causeway_core::engine::oracle::IndependenceFacts;
use causeway_core::engine::orient::Triple;
use causeway_core::{Knowledge, Pc, SearchError};
use causeway_tests::{edge_strings, node, vars};

#[test]
fn required_edge_survives_independence() {
    let mut facts = IndependenceFacts::new();
    facts.add_parsed("A _||_ B").unwrap();
    let mut knowledge = Knowledge::new();
    knowledge.set_required("A", "B");

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B"]))
        .unwrap();
    let g = &result.graph;
    let (a, b) = (node(g, "A"), node(g, "B"));

    assert!(g.is_directed_from_to(a, b));
    assert!(result.sepsets.get(a, b).is_none());
    assert_eq!(result.report.knowledge_oriented, vec![(a, b)]);
    assert_eq!(facts.calls(), 0);
}

#[test]
fn pair_forbidden_both_ways_is_removed_without_tests() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("A", "B").set_forbidden("B", "A");

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B", "C"]))
        .unwrap();
    let g = &result.graph;
    let (a, b) = (node(g, "A"), node(g, "B"));

    assert!(!g.is_adjacent(a, b));
    assert_eq!(result.knowledge_removed, vec![(a, b)]);
    assert_eq!(result.stats.knowledge_removed, 1);
    assert!(result.sepsets.get(a, b).is_none());
    // A --- C --- B has no sepset for {A, B}, so it is not a collider.
    assert!(result.report.colliders.is_empty());
    assert_eq!(edge_strings(g), vec!["A --- C", "B --- C"]);
}

#[test]
fn forbidden_direction_orients_the_reverse() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("A", "B");

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B"]))
        .unwrap();
    let g = &result.graph;
    assert!(g.is_directed_from_to(node(g, "B"), node(g, "A")));
}

#[test]
fn tiers_orient_across_and_leave_within() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge.add_to_tier(0, "A").add_to_tier(1, "B").add_to_tier(1, "C");

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B", "C"]))
        .unwrap();
    assert_eq!(edge_strings(&result.graph), vec!["A --> B", "A --> C", "B --- C"]);
}

#[test]
fn forbidden_within_tier_removes_the_pair() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge
        .add_to_tier(0, "A")
        .add_to_tier(1, "B")
        .add_to_tier(1, "C")
        .set_tier_forbidden_within(1, true);

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B", "C"]))
        .unwrap();
    let g = &result.graph;
    assert_eq!(edge_strings(g), vec!["A --> B", "A --> C"]);
    assert_eq!(result.knowledge_removed, vec![(node(g, "B"), node(g, "C"))]);
}

#[test]
fn blocked_collider_is_reported_ambiguous() {
    let mut facts = IndependenceFacts::new();
    facts.add_parsed("A _||_ C").unwrap();
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("A", "B");

    let result = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B", "C"]))
        .unwrap();
    let g = &result.graph;
    let (a, b, c) = (node(g, "A"), node(g, "B"), node(g, "C"));

    assert!(!g.is_directed_from_to(a, b));
    assert!(g.is_directed_from_to(b, a));
    assert!(result.report.colliders.is_empty());
    assert!(result.report.is_ambiguous(&Triple::new(a, b, c)));
}

#[test]
fn required_and_forbidden_together_is_a_contradiction() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge.set_required("A", "B").set_forbidden("A", "B");

    let err = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B"]))
        .unwrap_err();
    assert!(matches!(err, SearchError::KnowledgeContradiction(_)));
    assert_eq!(facts.calls(), 0);
}

#[test]
fn required_cycle_is_a_contradiction() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge
        .set_required("A", "B")
        .set_required("B", "C")
        .set_required("C", "A");

    let err = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B", "C"]))
        .unwrap_err();
    assert!(matches!(err, SearchError::KnowledgeContradiction(_)));
    assert_eq!(facts.calls(), 0);
}

#[test]
fn knowledge_about_unknown_variables_is_rejected() {
    let facts = IndependenceFacts::new();
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("A", "Z");

    let err = Pc::new(&facts)
        .with_knowledge(&knowledge)
        .search(&vars(&["A", "B"]))
        .unwrap_err();
    assert!(matches!(err, SearchError::UnknownVariable(name) if name == "Z"));
}
