use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vamana::benchmark::{run_sweep, GraphStats, GroundTruth, SweepConfig, Vectors};
use vamana::distance::{DistanceMetric, Euclidean, InnerProduct, Metric};
use vamana::graph::Graph;
use vamana::points::PointSet;
use vamana::vamana::{find_medoid, BuildParams, VamanaBuilder};

#[derive(Parser, Debug)]
#[command(name = "vamana", about = "Build and query a Vamana ANN graph")]
struct Args {
    /// Distance function: Euclidian or mips
    #[arg(long)]
    dist_func: String,

    /// Maximum out-degree of the graph
    #[arg(short = 'R', default_value_t = 0)]
    max_degree: usize,

    /// Search list size used while building
    #[arg(short = 'L', default_value_t = 0)]
    search_list: usize,

    /// Pruning slack applied on the last pass
    #[arg(long, default_value_t = 1.0)]
    alpha: f32,

    /// Neighbors per query (0 skips querying)
    #[arg(short = 'k', default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=1000))]
    k: u64,

    /// Build passes over the data
    #[arg(long, default_value_t = 1)]
    num_passes: usize,

    /// Base vectors (.fbin)
    #[arg(long)]
    base_path: PathBuf,

    /// Load this graph instead of building one
    #[arg(long)]
    graph_path: Option<PathBuf>,

    /// Write the graph here
    #[arg(long)]
    graph_outfile: Option<PathBuf>,

    /// Query vectors (.fbin)
    #[arg(long)]
    query_path: Option<PathBuf>,

    /// Ground truth for the queries
    #[arg(long)]
    gt_path: Option<PathBuf>,

    /// Write the beam sweep results (JSON) here
    #[arg(long)]
    res_path: Option<PathBuf>,

    /// Normalize base and query vectors to unit length
    #[arg(long)]
    normalize: bool,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,

    /// Insert every point of a pass in a single batch (any value > 0)
    #[arg(long, default_value_t = 0)]
    single_batch: usize,
}

/// Everything checked before any file is read.
struct Plan {
    metric: DistanceMetric,
    build: Option<BuildParams>,
    sweep: Option<SweepConfig>,
}

fn plan(args: &Args) -> anyhow::Result<Plan> {
    let metric: DistanceMetric = args.dist_func.parse()?;

    let build = if args.graph_path.is_some() {
        None
    } else {
        let params = BuildParams {
            max_degree: args.max_degree,
            search_list: args.search_list,
            alpha: args.alpha,
            num_passes: args.num_passes,
            single_batch: args.single_batch,
            ..BuildParams::default()
        };
        params.validate().context("invalid build parameters")?;
        Some(params)
    };

    let sweep = if args.k > 0 {
        if args.query_path.is_none() {
            bail!("-k {} needs --query-path", args.k);
        }
        let config = SweepConfig::new(args.k as usize);
        config.validate().context("invalid query parameters")?;
        Some(config)
    } else {
        if args.res_path.is_some() || args.gt_path.is_some() {
            warn!("-k is 0: ground truth and result path are ignored");
        }
        None
    };

    Ok(Plan {
        metric,
        build,
        sweep,
    })
}

fn load_vectors(path: &Path, normalize: bool) -> anyhow::Result<Vectors> {
    let mut vectors =
        Vectors::load(path).with_context(|| format!("reading vectors {}", path.display()))?;
    if normalize {
        vectors.normalize();
    }
    Ok(vectors)
}

fn run<M: Metric>(args: &Args, plan: &Plan, metric: M) -> anyhow::Result<()> {
    if args.normalize {
        info!("normalizing data");
    }
    let base = load_vectors(&args.base_path, args.normalize)?;
    let points = base.as_points(metric)?;

    let (graph, start) = match (&args.graph_path, &plan.build) {
        (Some(path), _) => {
            let graph = Graph::load(path)
                .with_context(|| format!("reading graph {}", path.display()))?;
            if graph.len() != points.len() {
                bail!(
                    "graph {} has {} nodes but {} has {} points",
                    path.display(),
                    graph.len(),
                    args.base_path.display(),
                    points.len()
                );
            }
            let stats = GraphStats::of(&graph);
            info!(
                avg_degree = stats.avg_degree,
                max_degree = stats.max_degree,
                "graph stats"
            );
            let start = find_medoid(&points);
            (graph, start)
        }
        (None, Some(params)) => {
            let (graph, outcome) = VamanaBuilder::new(&points, params.clone())?.build()?;
            (graph, outcome.start)
        }
        (None, None) => bail!("nothing to do: no graph to load and no build parameters"),
    };

    if let Some(out) = &args.graph_outfile {
        graph
            .save(out)
            .with_context(|| format!("writing graph {}", out.display()))?;
        info!(path = %out.display(), "saved graph");
    }

    let (Some(config), Some(query_path)) = (&plan.sweep, &args.query_path) else {
        return Ok(());
    };
    let queries = load_vectors(query_path, args.normalize)?;
    let ground_truth = args
        .gt_path
        .as_ref()
        .map(|p| {
            GroundTruth::load(p).with_context(|| format!("reading ground truth {}", p.display()))
        })
        .transpose()?;
    if ground_truth.is_none() {
        warn!("no ground truth given: recall is not reported");
    }

    let report = run_sweep(&graph, &points, &queries, start, ground_truth.as_ref(), config)?;
    if let Some(best) = report.best_recall() {
        info!(
            beam = best.beam_size,
            recall = best.recall.unwrap_or(0.0),
            qps = best.qps,
            "best recall"
        );
    }
    if let Some(res) = &args.res_path {
        report
            .save(res)
            .with_context(|| format!("writing results {}", res.display()))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "vamana=debug" } else { "vamana=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let plan = plan(&args)?;
    info!(metric = %plan.metric, "starting");
    match plan.metric {
        DistanceMetric::Euclidean => run(&args, &plan, Euclidean),
        DistanceMetric::InnerProduct => run(&args, &plan, InnerProduct),
    }
}
