//! JSON model and graph files.
//!
//! A model file declares the variables of a search, where its independence
//! judgements come from, optional background knowledge and search settings:
//!
//! ```json
//! {
//!   "variables": ["A", "B", { "name": "C", "kind": "discrete" }],
//!   "independences": ["A _||_ C"],
//!   "knowledge": { "forbidden": [["B", "A"]], "tiers": [["A"], ["B", "C"]] },
//!   "config": { "fas": { "depth": 2, "pool": "pc" }, "collider_policy": "sepset" }
//! }
//! ```
//!
//! Instead of `independences`, a model may give the true DAG as `edges`
//! (`"A --> B"` strings); judgements are then read off it by d-separation.
//!
//! Graph files hold a variable list and edge strings in the same notation
//! [`Graph::edge_string`] prints.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::errors::{OracleError, SearchError};
use crate::engine::graph::{Edge, Endpoint, Graph, Variable, VariableKind};
use crate::engine::knowledge::Knowledge;
use crate::engine::oracle::{DSeparationOracle, IndependenceFacts, IndependenceTest, TestOutcome};
use crate::engine::pc::PcConfig;

/// A variable given either as a bare name (continuous) or with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableEntry {
    Name(String),
    Typed {
        name: String,
        #[serde(default)]
        kind: VariableKind,
    },
}

impl VariableEntry {
    fn to_variable(&self) -> Variable {
        match self {
            VariableEntry::Name(name) => Variable::continuous(name.as_str()),
            VariableEntry::Typed { name, kind } => Variable::new(name.as_str(), *kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnowledgeSpec {
    /// Ordered `[from, to]` pairs.
    pub forbidden: Vec<[String; 2]>,
    pub required: Vec<[String; 2]>,
    /// Tier 0 first; later tiers cannot cause earlier ones.
    pub tiers: Vec<Vec<String>>,
    /// Indices of tiers whose members may not be adjacent to each other.
    pub forbidden_within_tiers: Vec<usize>,
}

impl KnowledgeSpec {
    pub fn to_knowledge(&self) -> Knowledge {
        let mut knowledge = Knowledge::new();
        for [from, to] in &self.forbidden {
            knowledge.set_forbidden(from.as_str(), to.as_str());
        }
        for [from, to] in &self.required {
            knowledge.set_required(from.as_str(), to.as_str());
        }
        for (tier, names) in self.tiers.iter().enumerate() {
            for name in names {
                knowledge.add_to_tier(tier, name.as_str());
            }
        }
        for &tier in &self.forbidden_within_tiers {
            knowledge.set_tier_forbidden_within(tier, true);
        }
        knowledge
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    pub variables: Vec<VariableEntry>,
    /// True DAG as edge strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<String>,
    #[serde(default)]
    pub knowledge: KnowledgeSpec,
    /// Facts written `X _||_ Y | Z1, Z2`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub independences: Vec<String>,
    #[serde(default)]
    pub config: PcConfig,
}

impl ModelFile {
    pub fn variables(&self) -> Vec<Variable> {
        self.variables.iter().map(VariableEntry::to_variable).collect()
    }

    /// Builds the knowledge object, checking every name against the variables.
    pub fn knowledge(&self) -> Result<Knowledge, SearchError> {
        let knowledge = self.knowledge.to_knowledge();
        knowledge.check_names(&Graph::new(self.variables())?)?;
        Ok(knowledge)
    }

    /// The declared true graph, if the model has one.
    pub fn true_graph(&self) -> Result<Option<Graph>, SearchError> {
        if self.edges.is_empty() {
            return Ok(None);
        }
        let mut graph = Graph::new(self.variables())?;
        for line in &self.edges {
            let edge = parse_edge(&graph, line)?;
            if !graph.add_edge(edge) {
                return Err(SearchError::Format(format!("duplicate or self-loop edge '{line}'")));
            }
        }
        Ok(Some(graph))
    }

    /// The oracle this model describes: declared facts if present, otherwise
    /// d-separation in the true DAG.
    pub fn oracle(&self) -> Result<ModelOracle, SearchError> {
        if !self.independences.is_empty() {
            let names = Graph::new(self.variables())?;
            let mut facts = IndependenceFacts::new();
            for fact in &self.independences {
                facts.add_parsed(fact)?;
            }
            for fact in &self.independences {
                for name in fact_names(fact) {
                    names.require_node(name)?;
                }
            }
            return Ok(ModelOracle::Facts(facts));
        }
        match self.true_graph()? {
            Some(dag) if dag.is_dag() => Ok(ModelOracle::DSeparation(DSeparationOracle::new(dag))),
            Some(_) => Err(SearchError::Format(
                "'edges' must describe a DAG to serve as an oracle".into(),
            )),
            None => Err(SearchError::Format(
                "model needs 'independences' or 'edges'".into(),
            )),
        }
    }
}

fn fact_names(fact: &str) -> impl Iterator<Item = &str> {
    fact.split("_||_")
        .flat_map(|part| part.split('|'))
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Oracle built from a model file.
#[derive(Debug)]
pub enum ModelOracle {
    Facts(IndependenceFacts),
    DSeparation(DSeparationOracle),
}

impl IndependenceTest for ModelOracle {
    fn test(&self, x: &Variable, y: &Variable, z: &[Variable]) -> Result<TestOutcome, OracleError> {
        match self {
            ModelOracle::Facts(facts) => facts.test(x, y, z),
            ModelOracle::DSeparation(dsep) => dsep.test(x, y, z),
        }
    }

    fn name(&self) -> &str {
        match self {
            ModelOracle::Facts(facts) => facts.name(),
            ModelOracle::DSeparation(dsep) => dsep.name(),
        }
    }
}

pub fn parse_model(json: &str) -> Result<ModelFile, SearchError> {
    serde_json::from_str(json).map_err(|e| SearchError::Format(e.to_string()))
}

pub fn load_model(path: impl AsRef<Path>) -> Result<ModelFile, SearchError> {
    let text = fs::read_to_string(path)?;
    parse_model(&text)
}

/// On-disk form of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphFile {
    pub variables: Vec<VariableEntry>,
    pub edges: Vec<String>,
}

impl GraphFile {
    pub fn from_graph(graph: &Graph) -> Self {
        let variables = graph
            .variables()
            .iter()
            .map(|v| match v.kind() {
                VariableKind::Continuous => VariableEntry::Name(v.name().to_string()),
                kind => VariableEntry::Typed {
                    name: v.name().to_string(),
                    kind,
                },
            })
            .collect();
        let edges = graph.edges().iter().map(|e| graph.edge_string(e)).collect();
        Self { variables, edges }
    }

    pub fn to_graph(&self) -> Result<Graph, SearchError> {
        let mut graph = Graph::new(self.variables.iter().map(VariableEntry::to_variable).collect())?;
        for line in &self.edges {
            let edge = parse_edge(&graph, line)?;
            if !graph.add_edge(edge) {
                return Err(SearchError::Format(format!("duplicate or self-loop edge '{line}'")));
            }
        }
        Ok(graph)
    }
}

pub fn save_graph(path: impl AsRef<Path>, graph: &Graph) -> Result<(), SearchError> {
    let json = serde_json::to_string_pretty(&GraphFile::from_graph(graph))
        .map_err(|e| SearchError::Internal(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph, SearchError> {
    let text = fs::read_to_string(path)?;
    let file: GraphFile = serde_json::from_str(&text).map_err(|e| SearchError::Format(e.to_string()))?;
    file.to_graph()
}

/// Parses `A --> B`, `A --- B`, `A <-> B`, `A o-> B` and the like; `.`
/// stands for a `Null` mark.
pub fn parse_edge(graph: &Graph, line: &str) -> Result<Edge, SearchError> {
    let malformed = || SearchError::Format(format!("malformed edge '{line}'"));
    let mut tokens = line.split_whitespace();
    let (Some(left), Some(mark), Some(right), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(malformed());
    };

    let mark = mark.as_bytes();
    if mark.len() != 3 || mark[1] != b'-' {
        return Err(malformed());
    }
    let endpoint1 = match mark[0] {
        b'-' => Endpoint::Tail,
        b'<' => Endpoint::Arrow,
        b'o' => Endpoint::Circle,
        b'.' => Endpoint::Null,
        _ => return Err(malformed()),
    };
    let endpoint2 = match mark[2] {
        b'-' => Endpoint::Tail,
        b'>' => Endpoint::Arrow,
        b'o' => Endpoint::Circle,
        b'.' => Endpoint::Null,
        _ => return Err(malformed()),
    };

    Ok(Edge::new(
        graph.require_node(left)?,
        graph.require_node(right)?,
        endpoint1,
        endpoint2,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::NodeId;
    use crate::engine::orient::ColliderPolicy;

    #[test]
    fn parses_full_model() {
        let model = parse_model(
            r#"{
                "variables": ["A", "B", { "name": "C", "kind": "discrete" }],
                "independences": ["A _||_ C"],
                "knowledge": { "forbidden": [["B", "A"]], "tiers": [["A"], ["B", "C"]] },
                "config": { "fas": { "depth": 2 }, "collider_policy": "conservative" }
            }"#,
        )
        .unwrap();

        let vars = model.variables();
        assert_eq!(vars.len(), 3);
        assert_eq!(vars[2].kind(), VariableKind::Discrete);
        assert_eq!(model.config.fas.depth, 2);
        assert_eq!(model.config.collider_policy, ColliderPolicy::Conservative);

        let knowledge = model.knowledge().unwrap();
        assert!(knowledge.is_forbidden("B", "A"));
        assert!(knowledge.is_forbidden("C", "A"));
        assert!(matches!(model.oracle().unwrap(), ModelOracle::Facts(_)));
    }

    #[test]
    fn defaults_apply_to_missing_sections() {
        let model = parse_model(r#"{ "variables": ["A", "B"], "edges": ["A --> B"] }"#).unwrap();
        assert_eq!(model.config, PcConfig::default());
        assert!(model.knowledge().unwrap().is_empty());
        assert!(matches!(model.oracle().unwrap(), ModelOracle::DSeparation(_)));
    }

    #[test]
    fn unknown_knowledge_name_is_rejected() {
        let model = parse_model(
            r#"{ "variables": ["A"], "knowledge": { "required": [["A", "Z"]] } }"#,
        )
        .unwrap();
        assert!(matches!(model.knowledge(), Err(SearchError::UnknownVariable(n)) if n == "Z"));
    }

    #[test]
    fn unknown_fact_name_is_rejected() {
        let model = parse_model(r#"{ "variables": ["A", "B"], "independences": ["A _||_ B | Q"] }"#).unwrap();
        assert!(matches!(model.oracle(), Err(SearchError::UnknownVariable(n)) if n == "Q"));
    }

    #[test]
    fn model_without_oracle_source_is_rejected() {
        let model = parse_model(r#"{ "variables": ["A", "B"] }"#).unwrap();
        assert!(matches!(model.oracle(), Err(SearchError::Format(_))));
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        assert!(matches!(parse_model("{ nope"), Err(SearchError::Format(_))));
        assert!(matches!(
            parse_model(r#"{ "variables": [], "extra": 1 }"#),
            Err(SearchError::Format(_))
        ));
    }

    #[test]
    fn edge_strings_parse() {
        let graph = Graph::new(vec![Variable::continuous("A"), Variable::continuous("B")]).unwrap();
        let (a, b) = (NodeId(0), NodeId(1));
        assert_eq!(parse_edge(&graph, "A --> B").unwrap(), Edge::directed(a, b));
        assert_eq!(parse_edge(&graph, "B --- A").unwrap(), Edge::undirected(b, a));
        let bidirected = parse_edge(&graph, "A <-> B").unwrap();
        assert_eq!(bidirected.endpoint1, Endpoint::Arrow);
        assert_eq!(bidirected.endpoint2, Endpoint::Arrow);
        assert!(matches!(parse_edge(&graph, "A -> B"), Err(SearchError::Format(_))));
        assert!(matches!(parse_edge(&graph, "A --> Z"), Err(SearchError::UnknownVariable(_))));
    }

    #[test]
    fn graph_file_preserves_edges() {
        let mut graph = Graph::new(vec![
            Variable::continuous("A"),
            Variable::discrete("B"),
            Variable::continuous("C"),
        ])
        .unwrap();
        graph.add_directed_edge(NodeId(0), NodeId(1));
        graph.add_undirected_edge(NodeId(1), NodeId(2));

        let file = GraphFile::from_graph(&graph);
        assert_eq!(file.edges, vec!["A --> B".to_string(), "B --- C".to_string()]);

        let json = serde_json::to_string(&file).unwrap();
        let back: GraphFile = serde_json::from_str(&json).unwrap();
        let restored = back.to_graph().unwrap();
        assert_eq!(restored.edges(), graph.edges());
        assert_eq!(restored.variables(), graph.variables());
    }

    #[test]
    fn null_marks_survive_a_graph_file() {
        let mut graph = Graph::new(vec![Variable::continuous("A"), Variable::continuous("B")]).unwrap();
        graph.add_edge(Edge::new(NodeId(0), NodeId(1), Endpoint::Null, Endpoint::Circle));

        let file = GraphFile::from_graph(&graph);
        assert_eq!(file.edges, vec!["A .-o B".to_string()]);
        let restored = file.to_graph().unwrap();
        assert_eq!(restored.edges(), graph.edges());
    }

    #[test]
    fn save_and_load_graph_on_disk() {
        let mut graph = Graph::new(vec![Variable::continuous("X1"), Variable::continuous("X2")]).unwrap();
        graph.add_directed_edge(NodeId(1), NodeId(0));
        let path = std::env::temp_dir().join(format!("causeway-graph-{}.json", std::process::id()));
        save_graph(&path, &graph).unwrap();
        let loaded = load_graph(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!(loaded.is_directed_from_to(NodeId(1), NodeId(0)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_model("/nonexistent/causeway/model.json").unwrap_err();
        assert!(matches!(err, SearchError::Io(_)));
    }
}
