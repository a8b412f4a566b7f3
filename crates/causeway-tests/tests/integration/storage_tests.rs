use std::fs;

use causeway_core::storage::{load_graph, load_model, parse_model, save_graph, ModelOracle};
use causeway_core::{ColliderPolicy, Pc};
use causeway_tests::edge_strings;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("causeway-{}-{}", std::process::id(), name))
}

#[test]
fn model_file_drives_a_search() {
    let path = temp_path("collider-model.json");
    fs::write(
        &path,
        r#"{
            "variables": ["A", "B", "C"],
            "independences": ["A _||_ C"]
        }"#,
    )
    .unwrap();

    let model = load_model(&path).unwrap();
    let _ = fs::remove_file(&path);

    let oracle = model.oracle().unwrap();
    assert!(matches!(oracle, ModelOracle::Facts(_)));
    let knowledge = model.knowledge().unwrap();
    let result = Pc::new(&oracle)
        .with_knowledge(&knowledge)
        .with_config(model.config)
        .search(&model.variables())
        .unwrap();
    assert_eq!(edge_strings(&result.graph), vec!["A --> B", "B <-- C"]);
}

#[test]
fn model_with_true_edges_uses_d_separation() {
    let model = parse_model(
        r#"{
            "variables": ["A", "B", "C", "D"],
            "edges": ["A --> C", "B --> C", "C --> D"],
            "knowledge": { "required": [["C", "D"]] },
            "config": { "collider_policy": "conservative" }
        }"#,
    )
    .unwrap();
    assert_eq!(model.config.collider_policy, ColliderPolicy::Conservative);

    let oracle = model.oracle().unwrap();
    let knowledge = model.knowledge().unwrap();
    let result = Pc::new(&oracle)
        .with_knowledge(&knowledge)
        .with_config(model.config)
        .search(&model.variables())
        .unwrap();
    assert_eq!(edge_strings(&result.graph), model.edges);
}

#[test]
fn saved_pattern_loads_back() {
    let model = parse_model(
        r#"{ "variables": ["X1", "X2", "X3"], "edges": ["X1 --> X2", "X2 --> X3"] }"#,
    )
    .unwrap();
    let oracle = model.oracle().unwrap();
    let result = Pc::new(&oracle).search(&model.variables()).unwrap();

    let path = temp_path("chain-pattern.json");
    save_graph(&path, &result.graph).unwrap();
    let loaded = load_graph(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(edge_strings(&loaded), vec!["X1 --- X2", "X2 --- X3"]);
    assert_eq!(loaded.edges(), result.graph.edges());
}
