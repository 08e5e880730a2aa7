#![warn(missing_docs)]
//! cxxprobe CLI Library
//!
//! Benchmark driver and results formatter behind the `cxxprobe` binary.
//!
//! ```text
//! cxxprobe run --benchmark-definition bench.yml --output-file results.jsonl \
//!     --fruit-sources-dir ~/fruit --fruit-benchmark-sources-dir ~/fruit
//! cxxprobe format --benchmark-results results.jsonl \
//!     --benchmark-tables-definition tables.yml
//! ```

mod config;
mod executor;
mod planner;

pub use config::{BenchmarkDefinitionFile, DefinitionBlock, GlobalSettings};
pub use executor::{
    BatchSummary, Benchmark, BenchmarkEnvironment, ConvergenceConfig, DependencyGraph, DiLibrary,
    ExecutionConfig, Executor, GRAPH_SEED, GeneratedKind, GeneratedProject, Measurements,
    ProjectSpec, RunOutcome, build_fruit, create_benchmark, describe, emit_makefile,
    generate_files, parse_measurements, run_until_converged, write_project,
};
pub use planner::{
    ExecutionPlan, ToolchainGroup, ToolchainKey, build_plan, expand_block, expand_blocks,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use cxxprobe_report::{ResultStore, load_records, load_table_definitions, render_tables};
use regex::Regex;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// cxxprobe CLI arguments
#[derive(Parser, Debug)]
#[command(name = "cxxprobe")]
#[command(author, version, about = "cxxprobe - C++ compile-time and DI benchmarking")]
pub struct Cli {
    /// What to do
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmarks of a definition file and record their results
    Run(RunArgs),
    /// Render recorded results as markdown tables
    Format(FormatArgs),
}

/// Arguments of `cxxprobe run`
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Checkout providing `extras/benchmark`
    #[arg(long)]
    pub fruit_benchmark_sources_dir: PathBuf,

    /// Fruit checkout under test
    #[arg(long)]
    pub fruit_sources_dir: PathBuf,

    /// Boost.DI checkout, required by `boost_di_*` benchmarks
    #[arg(long)]
    pub boost_di_sources_dir: Option<PathBuf>,

    /// JSON-lines results file
    #[arg(long)]
    pub output_file: PathBuf,

    /// Benchmark definition YAML
    #[arg(long)]
    pub benchmark_definition: PathBuf,

    /// Keep existing results and skip benchmarks already recorded
    #[arg(long, default_value = "false", action = clap::ArgAction::Set)]
    pub continue_benchmark: bool,

    /// Only run benchmarks whose name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Log failing benchmarks and continue with the rest
    #[arg(long)]
    pub keep_going: bool,
}

/// Arguments of `cxxprobe format`
#[derive(clap::Args, Debug)]
pub struct FormatArgs {
    /// JSON-lines results file
    #[arg(long)]
    pub benchmark_results: PathBuf,

    /// Results to compare against
    #[arg(long)]
    pub baseline_benchmark_results: Option<PathBuf>,

    /// Table definition YAML
    #[arg(long)]
    pub benchmark_tables_definition: PathBuf,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the cxxprobe CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the cxxprobe CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let default_filter = if cli.verbose {
        "cxxprobe=debug"
    } else {
        "cxxprobe=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_benchmarks(&args),
        Commands::Format(args) => format_results(&args),
    }
}

fn run_benchmarks(args: &RunArgs) -> anyhow::Result<()> {
    let definition = BenchmarkDefinitionFile::load(&args.benchmark_definition)?;
    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter")?;

    let plan = build_plan(&definition.benchmarks, filter.as_ref())?;
    if plan.total() == 0 {
        println!("No benchmarks found.");
        return Ok(());
    }
    info!(
        "{} benchmark(s) in {} toolchain group(s)",
        plan.total(),
        plan.groups.len()
    );

    let scratch = tempfile::Builder::new()
        .prefix("cxxprobe-")
        .tempdir()
        .context("Could not create a scratch directory")?;
    let env = BenchmarkEnvironment::new(
        args.fruit_sources_dir.clone(),
        args.fruit_benchmark_sources_dir.clone(),
        args.boost_di_sources_dir.clone(),
        scratch.path(),
    );
    let store = ResultStore::open(&args.output_file, args.continue_benchmark)?;

    let global = &definition.global;
    let config = ExecutionConfig {
        convergence: ConvergenceConfig {
            min_runs: global.min_runs,
            max_runs: global.max_runs,
            timeout: global.timeout(),
        },
        keep_going: args.keep_going,
    };
    let summary = Executor::new(config, env, store, scratch.path()).execute(&plan)?;

    info!(
        "Done: {} completed, {} skipped, {} failed",
        summary.completed,
        summary.skipped,
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        for (benchmark, err) in &summary.failed {
            warn!("Failed: {}: {}", benchmark, err);
        }
        bail!("{} benchmark(s) failed", summary.failed.len());
    }
    Ok(())
}

fn format_results(args: &FormatArgs) -> anyhow::Result<()> {
    let records = load_records(&args.benchmark_results)?;
    let baseline = args
        .baseline_benchmark_results
        .as_deref()
        .map(load_records)
        .transpose()?;
    let definitions = load_table_definitions(&args.benchmark_tables_definition)?;

    let markdown = render_tables(&definitions, &records, baseline.as_deref())?;
    match &args.output {
        Some(path) => std::fs::write(path, &markdown)
            .with_context(|| format!("Could not write {}", path.display()))?,
        None => print!("{}", markdown),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::try_parse_from([
            "cxxprobe",
            "run",
            "--fruit-benchmark-sources-dir",
            "/src/fruit",
            "--fruit-sources-dir",
            "/src/fruit",
            "--output-file",
            "out.jsonl",
            "--benchmark-definition",
            "bench.yml",
            "--continue-benchmark",
            "true",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.continue_benchmark);
        assert!(!args.keep_going);
        assert_eq!(args.boost_di_sources_dir, None);
    }

    #[test]
    fn test_run_requires_definition() {
        let parsed = Cli::try_parse_from([
            "cxxprobe",
            "run",
            "--fruit-benchmark-sources-dir",
            "/src/fruit",
            "--fruit-sources-dir",
            "/src/fruit",
            "--output-file",
            "out.jsonl",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_format_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results.jsonl");
        std::fs::write(
            &results,
            r#"{"benchmark":{"name":"fruit_compile_time","num_classes":100,"compiler":"g++"},"results":{"compile_time":[[1.2,1.4],[1.2,1.4]]}}"#,
        )
        .unwrap();
        let tables = dir.path().join("tables.yml");
        std::fs::write(
            &tables,
            "tables:\n  - name: Compile time\n    benchmark_filter:\n      name: fruit_compile_time\n    rows:\n      dimension: compiler\n    columns:\n      dimension: num_classes\n    results:\n      dimension: compile_time\n      unit: seconds\n",
        )
        .unwrap();
        let output = dir.path().join("tables.md");

        format_results(&FormatArgs {
            benchmark_results: results,
            baseline_benchmark_results: None,
            benchmark_tables_definition: tables,
            output: Some(output.clone()),
        })
        .unwrap();
        let markdown = std::fs::read_to_string(&output).unwrap();
        assert!(markdown.starts_with("## Compile time"));
        assert!(markdown.contains("| g++ |"));
    }
}
