//! Causeway CLI - run constraint-based causal searches from model files
//!
//! Usage:
//!   causeway search <model.json>                   # PC search, print the pattern
//!   causeway search <model.json> -o json           # Same, as JSON
//!   causeway search <model.json> --depth 2 --conservative
//!   causeway sweep --nodes 10 --edges 10,15,20     # Simulation sweep on random DAGs

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use causeway_core::engine::oracle::DSeparationOracle;
use causeway_core::metrics::{dag_to_pattern, GraphComparison, Summary};
use causeway_core::simulation::{random_dag, RandomDagConfig};
use causeway_core::storage::{load_model, save_graph, ModelOracle};
use causeway_core::{ColliderPolicy, Pc, PoolStrategy, SearchError, SearchResult, Variable};

#[derive(Parser)]
#[command(name = "causeway")]
#[command(version)]
#[command(about = "Causeway - constraint-based causal structure search")]
#[command(long_about = "Run PC searches over independence oracles and score them against known graphs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search a model file and print the resulting pattern
    Search(SearchArgs),
    /// Simulate random DAGs and report recovery statistics
    Sweep(SweepArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Input model file (JSON)
    #[arg(value_name = "MODEL")]
    model: PathBuf,

    /// Largest conditioning-set size; -1 for unbounded
    #[arg(short, long, allow_negative_numbers = true)]
    depth: Option<i32>,

    /// Conditioning-set pool
    #[arg(long, value_enum)]
    pool: Option<PoolArg>,

    /// Classify unshielded triples by re-testing (CPC) instead of sepsets
    #[arg(long)]
    conservative: bool,

    /// Evaluate each depth of the adjacency search in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: OutputFormat,

    /// Also write the pattern to this graph file
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

#[derive(Args)]
struct SweepArgs {
    /// Variables per simulated DAG
    #[arg(long, default_value_t = 10)]
    nodes: usize,

    /// Edge counts to sweep over
    #[arg(long, value_delimiter = ',', default_values_t = [10, 15, 20])]
    edges: Vec<usize>,

    /// Repetitions per edge count
    #[arg(long, default_value_t = 10)]
    reps: u64,

    /// Seed of the first repetition; later ones count up from it
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Largest conditioning-set size; -1 for unbounded
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    depth: i32,
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolArg {
    Pc,
    Union,
}

impl From<PoolArg> for PoolStrategy {
    fn from(arg: PoolArg) -> Self {
        match arg {
            PoolArg::Pc => PoolStrategy::Pc,
            PoolArg::Union => PoolStrategy::Union,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Search(args) => run_search(&args),
        Command::Sweep(args) => run_sweep(&args),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_search(args: &SearchArgs) -> Result<(), SearchError> {
    let model = load_model(&args.model)?;
    let variables = model.variables();
    let knowledge = model.knowledge()?;
    let oracle = model.oracle()?;

    let mut config = model.config;
    if let Some(depth) = args.depth {
        config.fas.depth = depth;
    }
    if let Some(pool) = args.pool {
        config.fas.pool = pool.into();
    }
    if args.conservative {
        config.collider_policy = ColliderPolicy::Conservative;
    }

    tracing::info!(
        model = %args.model.display(),
        variables = variables.len(),
        oracle = causeway_core::IndependenceTest::name(&oracle),
        "starting search"
    );

    let pc = Pc::new(&oracle).with_knowledge(&knowledge).with_config(config);
    let result = run_pc(&pc, &variables, args.parallel)?;

    let comparison = match model.true_graph()? {
        Some(dag) if dag.is_dag() => Some(GraphComparison::compare(&result.graph, &dag_to_pattern(&dag)?)?),
        _ => None,
    };

    match args.output {
        OutputFormat::Summary => print_summary(&result, comparison.as_ref()),
        OutputFormat::Json => {
            let json = format_result(&result, comparison.as_ref());
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => return Err(SearchError::Internal(e.to_string())),
            }
        }
    }

    if let Some(path) = &args.save {
        save_graph(path, &result.graph)?;
        tracing::info!(path = %path.display(), "pattern saved");
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_pc(pc: &Pc<'_, ModelOracle>, variables: &[Variable], parallel: bool) -> Result<SearchResult, SearchError> {
    if parallel {
        pc.search_parallel(variables)
    } else {
        pc.search(variables)
    }
}

#[cfg(not(feature = "parallel"))]
fn run_pc(pc: &Pc<'_, ModelOracle>, variables: &[Variable], parallel: bool) -> Result<SearchResult, SearchError> {
    if parallel {
        tracing::warn!("built without the `parallel` feature; running sequentially");
    }
    pc.search(variables)
}

fn print_summary(result: &SearchResult, comparison: Option<&GraphComparison>) {
    let graph = &result.graph;
    println!("Pattern ({} edges):", graph.num_edges());
    for (i, edge) in graph.edges().iter().enumerate() {
        println!("  {}. {}", i + 1, graph.edge_string(edge));
    }

    if !result.sepsets.is_empty() {
        println!("\nSepsets ({}):", result.sepsets.len());
        for line in result.sepsets.describe(graph) {
            println!("  {}", line);
        }
    }

    if !result.knowledge_removed.is_empty() {
        println!("\nRemoved by knowledge ({}):", result.knowledge_removed.len());
        for &(a, b) in &result.knowledge_removed {
            println!("  {} -- {}", graph.name(a), graph.name(b));
        }
    }

    if !result.report.ambiguous.is_empty() {
        println!("\nAmbiguous triples ({}):", result.report.ambiguous.len());
        for triple in &result.report.ambiguous {
            println!("  {}", triple.describe(graph));
        }
    }

    let stats = &result.stats;
    println!("\nStatistics:");
    println!("  tests run        = {}", result.total_tests);
    println!("  cache hits       = {}", stats.cache_hits);
    println!("  oracle failures  = {}", stats.oracle_failures + result.report.oracle_failures);
    match stats.depth_reached() {
        Some(depth) => println!("  depth reached    = {}", depth),
        None => println!("  depth reached    = -"),
    }
    println!("  removed by depth = {:?}", stats.removed_by_depth);
    println!("  colliders        = {}", result.report.colliders.len());
    println!("  meek orientations = {}", result.report.meek.len());

    if let Some(cmp) = comparison {
        println!("\nAgainst true pattern:");
        println!("  adjacency precision = {}", fmt_ratio(cmp.adjacency.precision()));
        println!("  adjacency recall    = {}", fmt_ratio(cmp.adjacency.recall()));
        println!("  arrowhead precision = {}", fmt_ratio(cmp.arrowhead.precision()));
        println!("  arrowhead recall    = {}", fmt_ratio(cmp.arrowhead.recall()));
        println!("  SHD                 = {}", cmp.shd);
    }
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}

/// Format a search result for JSON serialization
fn format_result(result: &SearchResult, comparison: Option<&GraphComparison>) -> serde_json::Value {
    let graph = &result.graph;
    let edges: Vec<String> = graph.edges().iter().map(|e| graph.edge_string(e)).collect();
    let ambiguous: Vec<String> = result
        .report
        .ambiguous
        .iter()
        .map(|t| t.describe(graph))
        .collect();
    let colliders: Vec<String> = result
        .report
        .colliders
        .iter()
        .map(|t| t.describe(graph))
        .collect();
    let knowledge_removed: Vec<[&str; 2]> = result
        .knowledge_removed
        .iter()
        .map(|&(a, b)| [graph.name(a), graph.name(b)])
        .collect();

    json!({
        "edges": edges,
        "sepsets": result.sepsets.describe(graph),
        "knowledge_removed": knowledge_removed,
        "colliders": colliders,
        "ambiguous": ambiguous,
        "stats": {
            "tests_run": result.total_tests,
            "cache_hits": result.stats.cache_hits,
            "oracle_failures": result.stats.oracle_failures + result.report.oracle_failures,
            "removed_by_depth": result.stats.removed_by_depth,
            "meek_orientations": result.report.meek.len(),
        },
        "comparison": comparison,
    })
}

fn run_sweep(args: &SweepArgs) -> Result<(), SearchError> {
    println!(
        "{:>6} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "edges", "adj_p", "adj_r", "arr_p", "arr_r", "shd", "tests"
    );

    for &num_edges in &args.edges {
        let mut adj_p = Summary::new();
        let mut adj_r = Summary::new();
        let mut arr_p = Summary::new();
        let mut arr_r = Summary::new();
        let mut shd = Summary::new();
        let mut tests = Summary::new();

        for rep in 0..args.reps {
            let config = RandomDagConfig::new(args.nodes, num_edges, args.seed.wrapping_add(rep));
            let dag = random_dag(&config)?;
            let truth = dag_to_pattern(&dag)?;
            let variables = dag.variables().to_vec();
            let oracle = DSeparationOracle::new(dag);

            let result = Pc::new(&oracle).with_depth(args.depth).search(&variables)?;
            let cmp = GraphComparison::compare(&result.graph, &truth)?;

            adj_p.push_opt(cmp.adjacency.precision());
            adj_r.push_opt(cmp.adjacency.recall());
            arr_p.push_opt(cmp.arrowhead.precision());
            arr_r.push_opt(cmp.arrowhead.recall());
            shd.push(cmp.shd as f64);
            tests.push(result.total_tests as f64);
        }

        tracing::debug!(edges = num_edges, reps = args.reps, "sweep row complete");
        println!(
            "{:>6} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            num_edges,
            fmt_mean(&adj_p),
            fmt_mean(&adj_r),
            fmt_mean(&arr_p),
            fmt_mean(&arr_r),
            fmt_mean(&shd),
            fmt_mean(&tests),
        );
    }
    Ok(())
}

fn fmt_mean(summary: &Summary) -> String {
    summary.mean().map_or_else(|| "n/a".to_string(), |m| format!("{:.3}", m))
}
