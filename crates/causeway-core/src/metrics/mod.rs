//! Graph comparison metrics.
//!
//! Scores an estimated pattern against a ground-truth graph:
//! - `dag_to_pattern`: the CPDAG of a DAG, which is what a perfect search returns.
//! - `Confusion`: true/false positive counts with precision, recall and F1.
//! - `structural_hamming_distance`: pairs whose adjacency or marks disagree.
//! - `Summary`: mean and standard deviation over repeated runs.
//!
//! Graphs are aligned by variable name, so the two sides may list their
//! variables in different orders.
//!
//! Numeric stability: `Summary` accumulates with Kahan compensated summation.

use rustc_hash::FxHashSet;

use crate::engine::errors::SearchError;
use crate::engine::graph::{Endpoint, Graph, NodeId};
use crate::engine::meek::MeekRules;

/// Pattern (CPDAG) of a DAG: its skeleton with exactly the compelled edges
/// oriented.
///
/// Returns `SearchError::InvalidConfig` if `dag` has an undirected edge or a
/// directed cycle.
pub fn dag_to_pattern(dag: &Graph) -> Result<Graph, SearchError> {
    if !dag.is_dag() {
        return Err(SearchError::InvalidConfig(
            "pattern requested for a graph that is not a DAG".into(),
        ));
    }

    let mut pattern = dag.clone();
    pattern.make_undirected();

    for y in dag.nodes() {
        let parents = dag.parents(y);
        for (i, &x) in parents.iter().enumerate() {
            for &z in &parents[i + 1..] {
                if !dag.is_adjacent(x, z) {
                    pattern.orient(x, y);
                    pattern.orient(z, y);
                }
            }
        }
    }

    MeekRules::new().orient_implied(&mut pattern);
    Ok(pattern)
}

/// Counts from comparing a set of estimated features against the truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Confusion {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Confusion {
    fn from_sets<K: Eq + std::hash::Hash>(estimated: &FxHashSet<K>, truth: &FxHashSet<K>) -> Self {
        let true_positives = estimated.intersection(truth).count();
        Self {
            true_positives,
            false_positives: estimated.len() - true_positives,
            false_negatives: truth.len() - true_positives,
        }
    }

    /// `None` when nothing was estimated.
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `None` when the truth is empty.
    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> Option<f64> {
        let (p, r) = (self.precision()?, self.recall()?);
        if p + r == 0.0 {
            Some(0.0)
        } else {
            Some(2.0 * p * r / (p + r))
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Both graphs expressed over the truth's node ids.
struct Aligned<'g> {
    estimated: &'g Graph,
    truth: &'g Graph,
    /// Estimated node id by truth node index.
    to_estimated: Vec<NodeId>,
}

impl<'g> Aligned<'g> {
    fn new(estimated: &'g Graph, truth: &'g Graph) -> Result<Self, SearchError> {
        if estimated.num_nodes() != truth.num_nodes() {
            return Err(SearchError::InvalidConfig(format!(
                "cannot compare graphs over {} and {} variables",
                estimated.num_nodes(),
                truth.num_nodes()
            )));
        }
        let to_estimated = truth
            .variables()
            .iter()
            .map(|v| estimated.require_node(v.name()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            estimated,
            truth,
            to_estimated,
        })
    }

    fn est(&self, id: NodeId) -> NodeId {
        self.to_estimated[id.index()]
    }

    /// Unordered adjacent pairs, in truth ids.
    fn adjacencies(&self) -> (FxHashSet<(NodeId, NodeId)>, FxHashSet<(NodeId, NodeId)>) {
        let truth = self
            .truth
            .edges()
            .iter()
            .map(|e| ordered(e.node1, e.node2))
            .collect();
        let estimated = self
            .unordered_pairs()
            .filter(|&(a, b)| self.estimated.is_adjacent(self.est(a), self.est(b)))
            .collect();
        (estimated, truth)
    }

    /// Ordered `(from, into)` pairs carrying an arrowhead at `into`, in truth ids.
    fn arrowheads(&self) -> (FxHashSet<(NodeId, NodeId)>, FxHashSet<(NodeId, NodeId)>) {
        let mut estimated = FxHashSet::default();
        let mut truth = FxHashSet::default();
        for (a, b) in self.unordered_pairs() {
            for (from, into) in [(a, b), (b, a)] {
                if self.truth.endpoint(from, into) == Some(Endpoint::Arrow) {
                    truth.insert((from, into));
                }
                if self.estimated.endpoint(self.est(from), self.est(into)) == Some(Endpoint::Arrow) {
                    estimated.insert((from, into));
                }
            }
        }
        (estimated, truth)
    }

    fn unordered_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let n = self.truth.num_nodes() as u32;
        (0..n).flat_map(move |a| (a + 1..n).map(move |b| (NodeId(a), NodeId(b))))
    }

    fn marks_differ(&self, a: NodeId, b: NodeId) -> bool {
        let (ea, eb) = (self.est(a), self.est(b));
        self.truth.endpoint(a, b) != self.estimated.endpoint(ea, eb)
            || self.truth.endpoint(b, a) != self.estimated.endpoint(eb, ea)
    }
}

fn ordered(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Adjacency confusion of `estimated` against `truth`.
pub fn adjacency_confusion(estimated: &Graph, truth: &Graph) -> Result<Confusion, SearchError> {
    let aligned = Aligned::new(estimated, truth)?;
    let (est, tru) = aligned.adjacencies();
    Ok(Confusion::from_sets(&est, &tru))
}

/// Arrowhead confusion of `estimated` against `truth`, counting each
/// arrowhead mark separately (a bidirected edge carries two).
pub fn arrowhead_confusion(estimated: &Graph, truth: &Graph) -> Result<Confusion, SearchError> {
    let aligned = Aligned::new(estimated, truth)?;
    let (est, tru) = aligned.arrowheads();
    Ok(Confusion::from_sets(&est, &tru))
}

/// Number of unordered pairs that are adjacent in only one graph, or
/// adjacent in both with different marks.
pub fn structural_hamming_distance(estimated: &Graph, truth: &Graph) -> Result<usize, SearchError> {
    let aligned = Aligned::new(estimated, truth)?;
    Ok(aligned
        .unordered_pairs()
        .filter(|&(a, b)| aligned.marks_differ(a, b))
        .count())
}

/// All comparison statistics for one estimated graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphComparison {
    pub adjacency: Confusion,
    pub arrowhead: Confusion,
    pub shd: usize,
}

impl GraphComparison {
    pub fn compare(estimated: &Graph, truth: &Graph) -> Result<Self, SearchError> {
        let aligned = Aligned::new(estimated, truth)?;
        let (est_adj, tru_adj) = aligned.adjacencies();
        let (est_arrow, tru_arrow) = aligned.arrowheads();
        let shd = aligned
            .unordered_pairs()
            .filter(|&(a, b)| aligned.marks_differ(a, b))
            .count();
        Ok(Self {
            adjacency: Confusion::from_sets(&est_adj, &tru_adj),
            arrowhead: Confusion::from_sets(&est_arrow, &tru_arrow),
            shd,
        })
    }
}

/// Running mean and standard deviation of a series of observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summary {
    count: usize,
    sum: f64,
    compensation: f64,
    sum_sq: f64,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        // Kahan: carry the low-order bits lost by the previous add
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
        self.sum_sq += value * value;
        self.count += 1;
    }

    /// Pushes `value` if present; undefined ratios are skipped.
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sample standard deviation; `None` below two observations.
    pub fn std_dev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let var = (self.sum_sq - n * mean * mean) / (n - 1.0);
        Some(var.max(0.0).sqrt())
    }
}

impl FromIterator<f64> for Summary {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut summary = Summary::new();
        for v in iter {
            summary.push(v);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::Variable;

    fn graph(names: &[&str]) -> Graph {
        Graph::new(names.iter().map(|n| Variable::continuous(*n)).collect()).unwrap()
    }

    fn id(g: &Graph, name: &str) -> NodeId {
        g.node_id(name).unwrap()
    }

    #[test]
    fn pattern_of_collider_keeps_orientation() {
        let mut dag = graph(&["A", "B", "C"]);
        dag.add_directed_edge(NodeId(0), NodeId(1));
        dag.add_directed_edge(NodeId(2), NodeId(1));
        let pattern = dag_to_pattern(&dag).unwrap();
        assert!(pattern.is_directed_from_to(NodeId(0), NodeId(1)));
        assert!(pattern.is_directed_from_to(NodeId(2), NodeId(1)));
    }

    #[test]
    fn pattern_of_chain_is_undirected() {
        let mut dag = graph(&["A", "B", "C"]);
        dag.add_directed_edge(NodeId(0), NodeId(1));
        dag.add_directed_edge(NodeId(1), NodeId(2));
        let pattern = dag_to_pattern(&dag).unwrap();
        assert!(pattern.is_undirected(NodeId(0), NodeId(1)));
        assert!(pattern.is_undirected(NodeId(1), NodeId(2)));
    }

    #[test]
    fn pattern_propagates_below_collider() {
        // A --> C <-- B, C --> D: D is compelled by R1
        let mut dag = graph(&["A", "B", "C", "D"]);
        dag.add_directed_edge(NodeId(0), NodeId(2));
        dag.add_directed_edge(NodeId(1), NodeId(2));
        dag.add_directed_edge(NodeId(2), NodeId(3));
        let pattern = dag_to_pattern(&dag).unwrap();
        assert!(pattern.is_directed_from_to(NodeId(2), NodeId(3)));
    }

    #[test]
    fn pattern_rejects_cyclic_graph() {
        let mut g = graph(&["A", "B"]);
        g.add_undirected_edge(NodeId(0), NodeId(1));
        assert!(matches!(dag_to_pattern(&g), Err(SearchError::InvalidConfig(_))));
    }

    #[test]
    fn identical_graphs_score_perfectly() {
        let mut g = graph(&["A", "B", "C"]);
        g.add_directed_edge(NodeId(0), NodeId(1));
        g.add_undirected_edge(NodeId(1), NodeId(2));
        let cmp = GraphComparison::compare(&g, &g).unwrap();
        assert_eq!(cmp.shd, 0);
        assert_eq!(cmp.adjacency.precision(), Some(1.0));
        assert_eq!(cmp.adjacency.recall(), Some(1.0));
        assert_eq!(cmp.arrowhead.true_positives, 1);
        assert_eq!(cmp.arrowhead.f1(), Some(1.0));
    }

    #[test]
    fn comparison_aligns_by_name() {
        let mut truth = graph(&["A", "B", "C"]);
        truth.add_directed_edge(NodeId(0), NodeId(1));

        let mut est = graph(&["C", "B", "A"]);
        let (a, b) = (id(&est, "A"), id(&est, "B"));
        est.add_directed_edge(a, b);

        assert_eq!(structural_hamming_distance(&est, &truth).unwrap(), 0);
    }

    #[test]
    fn counts_missing_extra_and_misoriented() {
        let mut truth = graph(&["A", "B", "C", "D"]);
        truth.add_directed_edge(NodeId(0), NodeId(1));
        truth.add_directed_edge(NodeId(1), NodeId(2));

        let mut est = graph(&["A", "B", "C", "D"]);
        est.add_directed_edge(NodeId(1), NodeId(0)); // reversed
        est.add_undirected_edge(NodeId(2), NodeId(3)); // extra; B-C missing

        let adj = adjacency_confusion(&est, &truth).unwrap();
        assert_eq!(adj.true_positives, 1);
        assert_eq!(adj.false_positives, 1);
        assert_eq!(adj.false_negatives, 1);

        let arrows = arrowhead_confusion(&est, &truth).unwrap();
        assert_eq!(arrows.true_positives, 0);
        assert_eq!(arrows.false_positives, 1);
        assert_eq!(arrows.false_negatives, 2);

        assert_eq!(structural_hamming_distance(&est, &truth).unwrap(), 3);
    }

    #[test]
    fn mismatched_variables_are_rejected() {
        let a = graph(&["A", "B"]);
        let b = graph(&["A", "C"]);
        assert!(matches!(
            GraphComparison::compare(&a, &b),
            Err(SearchError::UnknownVariable(name)) if name == "C"
        ));
    }

    #[test]
    fn empty_estimate_has_undefined_precision() {
        let est = graph(&["A", "B"]);
        let mut truth = graph(&["A", "B"]);
        truth.add_undirected_edge(NodeId(0), NodeId(1));
        let adj = adjacency_confusion(&est, &truth).unwrap();
        assert_eq!(adj.precision(), None);
        assert_eq!(adj.recall(), Some(0.0));
    }

    #[test]
    fn summary_mean_and_deviation() {
        let s: Summary = [1.0, 2.0, 3.0, 4.0].into_iter().collect();
        assert_eq!(s.count(), 4);
        assert!((s.mean().unwrap() - 2.5).abs() < 1e-12);
        assert!((s.std_dev().unwrap() - 1.290_994_448_735_805_6).abs() < 1e-9);

        let mut single = Summary::new();
        single.push_opt(None);
        single.push(7.0);
        assert_eq!(single.mean(), Some(7.0));
        assert_eq!(single.std_dev(), None);
    }
}
