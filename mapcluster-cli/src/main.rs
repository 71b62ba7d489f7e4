//! mapcluster CLI - Command-line interface for map feature clustering.
//!
//! Reads clustering requests as JSON, runs them on a worker thread and
//! writes the response as JSON.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use clap::{Parser, Subcommand, ValueEnum};

use mapcluster_algorithms::AdaptiveDispatcher;
use mapcluster_core::{CancellationToken, ClusterRequest, ClusteringResult, Strategy};
use mapcluster_worker::{spawn_clustering, WorkerError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] mapcluster_core::Error),

    #[error("Clustering error: {0}")]
    Clustering(#[from] mapcluster_core::ClusteringError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Clustering strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Fixed-size cell binning
    Grid,
    /// Greedy nearest-centroid assignment
    Distance,
    /// Density-reachability expansion
    Density,
    /// Choose from the estimated point density
    Adaptive,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Grid => Strategy::Grid,
            StrategyArg::Distance => Strategy::Distance,
            StrategyArg::Density => Strategy::Density,
            StrategyArg::Adaptive => Strategy::Adaptive,
        }
    }
}

/// Adaptive spatial clustering of map features.
#[derive(Parser)]
#[command(name = "mapcluster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster the features of a JSON request file
    Cluster {
        /// Request file (`{features, config, viewParams}`)
        input: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the strategy from the request
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Give up and cancel after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,

        /// Reject invalid config values instead of resetting them
        #[arg(long)]
        strict: bool,
    },

    /// Show how a request would be dispatched
    Info {
        /// Request file
        input: PathBuf,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Benchmark every concrete strategy on a request
    Benchmark {
        /// Request file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn read_request(path: &Path) -> Result<ClusterRequest> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<W: Write>(mut writer: W, result: &ClusteringResult, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, result)?;
    } else {
        serde_json::to_writer(&mut writer, result)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn write_result(result: &ClusteringResult, output: Option<&Path>, pretty: bool) -> Result<()> {
    match output {
        Some(path) => write_json(BufWriter::new(File::create(path)?), result, pretty),
        None => write_json(io::stdout().lock(), result, pretty),
    }
}

/// Run a request on a worker thread, optionally bounded by a timeout.
fn run_on_worker(request: ClusterRequest, timeout: Option<Duration>) -> Result<ClusteringResult> {
    let handle = spawn_clustering(request)?;
    let result = match timeout {
        Some(timeout) => handle.wait_timeout(timeout)?,
        None => handle.wait()?,
    };
    Ok(result)
}

fn summary_line(result: &ClusteringResult) -> String {
    format!(
        "{} features -> {} clusters, {} unclustered ({}, {:.2} ms)",
        result.stats.total_features,
        result.stats.total_clusters,
        result.unclustered.len(),
        result.stats.strategy,
        result.stats.processing_time_ms
    )
}

/// Timing of one strategy over several runs.
#[derive(Debug)]
struct BenchmarkRow {
    strategy: Strategy,
    clusters: usize,
    mean_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

fn benchmark(request: &ClusterRequest, iterations: usize) -> Result<Vec<BenchmarkRow>> {
    if iterations == 0 {
        return Err(CliError::InvalidArgument(
            "iterations must be at least 1".to_string(),
        ));
    }

    let dispatcher = AdaptiveDispatcher::new();
    let cancel = CancellationToken::new();
    let mut rows = Vec::new();

    for strategy in [Strategy::Grid, Strategy::Distance, Strategy::Density] {
        let mut run_request = request.clone();
        run_request.config.strategy = strategy;

        // Warmup
        let warm = dispatcher.dispatch(run_request.clone(), &cancel)?;

        let mut times = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let start = Instant::now();
            dispatcher.dispatch(run_request.clone(), &cancel)?;
            times.push(start.elapsed().as_secs_f64() * 1000.0);
        }

        rows.push(BenchmarkRow {
            strategy,
            clusters: warm.stats.total_clusters,
            mean_ms: times.iter().sum::<f64>() / times.len() as f64,
            min_ms: times.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            max_ms: times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        });
    }

    Ok(rows)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Cluster {
            input,
            output,
            strategy,
            timeout_ms,
            pretty,
            strict,
        } => {
            let mut request = read_request(&input)?;
            if let Some(strategy) = strategy {
                request.config.strategy = strategy.into();
            }
            if strict {
                request.config.validate()?;
            }
            log::debug!(
                "read {} features from {}",
                request.features.len(),
                input.display()
            );

            let result = run_on_worker(request, timeout_ms.map(Duration::from_millis))?;
            write_result(&result, output.as_deref(), pretty)?;

            if let Some(path) = &output {
                eprintln!("Wrote {}", path.display());
            }
            eprintln!("{}", summary_line(&result));
        }

        Commands::Info { input, json } => {
            let request = read_request(&input)?;
            let plan = AdaptiveDispatcher::new().plan(&request);

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("File: {}", input.display());
                println!("Features: {}", plan.feature_count);
                println!("Malformed geometry: {}", plan.sentinel_anchors);
                println!(
                    "Extent: [{}, {}, {}, {}]",
                    plan.extent.min_x, plan.extent.min_y, plan.extent.max_x, plan.extent.max_y
                );
                println!("Density: {:.6} features/unit^2", plan.density);
                println!(
                    "Strategy: {}{}",
                    plan.strategy,
                    if plan.adaptive { " (adaptive)" } else { "" }
                );
                if !plan.reset_fields.is_empty() {
                    println!("Reset to defaults: {}", plan.reset_fields.join(", "));
                }
            }
        }

        Commands::Benchmark { input, iterations } => {
            let request = read_request(&input)?;

            println!(
                "Benchmarking with {} features, {} iterations",
                request.features.len(),
                iterations
            );
            println!(
                "{:<10} | {:<10} | {:<15} | {:<15} | {:<15}",
                "Strategy", "Clusters", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<78}", "");

            for row in benchmark(&request, iterations)? {
                println!(
                    "{:<10} | {:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                    row.strategy.to_string(),
                    row.clusters,
                    row.mean_ms,
                    row.min_ms,
                    row.max_ms
                );
            }
        }
    }

    Ok(())
}
