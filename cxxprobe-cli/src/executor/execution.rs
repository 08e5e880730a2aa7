//! Batch Execution
//!
//! Drives an [`ExecutionPlan`] group by group:
//!
//! ```text
//! ToolchainGroup
//!       │
//!       ▼
//!   describe()        compiler identity + commit of the code under test
//!       │
//!       ▼
//!   resume check      skip mappings already in the result store
//!       │
//!       ▼
//!   build_fruit()     once per group, only if something is pending
//!       │
//!       ▼
//!   run_until_converged() → ResultStore::append()
//! ```
//!
//! Failures abort the batch unless `keep_going` is set, in which case they
//! are logged and collected in the [`BatchSummary`].

use super::benchmarks::{BenchmarkEnvironment, build_fruit, create_benchmark};
use super::metadata::describe;
use super::runner::{Benchmark, ConvergenceConfig, run_until_converged};
use crate::planner::{ExecutionPlan, ToolchainGroup};
use anyhow::Context;
use cxxprobe_core::ParameterMapping;
use cxxprobe_report::{BenchmarkRecord, ResultStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info};

type Describer =
    fn(&ParameterMapping, &BenchmarkEnvironment, &Path) -> anyhow::Result<ParameterMapping>;
type Factory = fn(ParameterMapping, &BenchmarkEnvironment) -> anyhow::Result<Box<dyn Benchmark>>;

/// Configuration for a batch run
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Stopping rules for every benchmark
    pub convergence: ConvergenceConfig,
    /// Log failures and continue instead of aborting
    pub keep_going: bool,
}

/// What happened to the benchmarks of a batch
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Benchmarks run and recorded
    pub completed: usize,
    /// Benchmarks already present in the result store
    pub skipped: usize,
    /// Benchmarks that failed, with the error chain
    pub failed: Vec<(ParameterMapping, String)>,
}

/// Runs benchmarks and appends their results to a store
pub struct Executor {
    config: ExecutionConfig,
    env: BenchmarkEnvironment,
    store: ResultStore,
    probe_root: PathBuf,
    describe: Describer,
    factory: Factory,
}

impl Executor {
    /// Create an executor; identity probes run under `probe_root`
    pub fn new(
        config: ExecutionConfig,
        env: BenchmarkEnvironment,
        store: ResultStore,
        probe_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            env,
            store,
            probe_root: probe_root.into(),
            describe,
            factory: create_benchmark,
        }
    }

    /// Execute every group of `plan` in order
    pub fn execute(&mut self, plan: &ExecutionPlan) -> anyhow::Result<BatchSummary> {
        let pb = ProgressBar::new(plan.total() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut summary = BatchSummary::default();
        for group in &plan.groups {
            self.execute_group(group, &pb, &mut summary)?;
        }

        pb.finish_with_message("Complete");
        Ok(summary)
    }

    fn execute_group(
        &mut self,
        group: &ToolchainGroup,
        pb: &ProgressBar,
        summary: &mut BatchSummary,
    ) -> anyhow::Result<()> {
        let mut pending = Vec::new();
        for benchmark in &group.benchmarks {
            let described = (self.describe)(benchmark, &self.env, &self.probe_root)?;
            if self.store.is_completed(&described) {
                info!("Skipping {}: already in {}", described, self.store.path().display());
                summary.skipped += 1;
                pb.inc(1);
            } else {
                pending.push(described);
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        if group.needs_fruit_build() {
            if let Err(err) = build_fruit(&self.env, &group.key) {
                let err = err.context(format!("Building Fruit with {}", group.key.compiler));
                if !self.config.keep_going {
                    return Err(err);
                }
                error!("{:#}; skipping {} benchmark(s)", err, pending.len());
                for benchmark in pending {
                    summary.failed.push((benchmark, format!("{:#}", err)));
                    pb.inc(1);
                }
                return Ok(());
            }
        }

        for benchmark in pending {
            pb.set_message(
                benchmark
                    .get_str("name")
                    .unwrap_or("benchmark")
                    .to_string(),
            );
            match self.execute_single(benchmark.clone()) {
                Ok(()) => summary.completed += 1,
                Err(err) if self.config.keep_going => {
                    error!("{:#}", err);
                    summary.failed.push((benchmark, format!("{:#}", err)));
                }
                Err(err) => return Err(err),
            }
            pb.inc(1);
        }
        Ok(())
    }

    fn execute_single(&mut self, benchmark: ParameterMapping) -> anyhow::Result<()> {
        let context = format!("Benchmark {}", benchmark);
        let mut runnable = (self.factory)(benchmark, &self.env).context(context.clone())?;
        let outcome =
            run_until_converged(runnable.as_mut(), &self.config.convergence).context(context)?;
        let record = BenchmarkRecord {
            benchmark: runnable.describe().clone(),
            results: outcome.results,
        };
        self.store.append(&record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionBlock;
    use crate::planner::build_plan;
    use super::super::runner::Measurements;
    use cxxprobe_core::DimensionValue;
    use cxxprobe_report::load_records;

    struct Constant(ParameterMapping);

    impl Benchmark for Constant {
        fn prepare(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn run(&mut self) -> anyhow::Result<Measurements> {
            if self.0.get_str("name") == Some("broken") {
                anyhow::bail!("make failed");
            }
            Ok(Measurements::from([("compile_time".to_string(), 2.0)]))
        }
        fn describe(&self) -> &ParameterMapping {
            &self.0
        }
    }

    fn constant(
        params: ParameterMapping,
        _: &BenchmarkEnvironment,
    ) -> anyhow::Result<Box<dyn Benchmark>> {
        Ok(Box::new(Constant(params)))
    }

    fn with_compiler_name(
        params: &ParameterMapping,
        _: &BenchmarkEnvironment,
        _: &Path,
    ) -> anyhow::Result<ParameterMapping> {
        Ok(params.clone().with("compiler_name", "GCC 12.2.0"))
    }

    fn plan(names: &[&str]) -> ExecutionPlan {
        let block: DefinitionBlock = [
            (
                "name".to_string(),
                DimensionValue::Tuple(names.iter().map(|n| DimensionValue::from(*n)).collect()),
            ),
            ("compiler".to_string(), "g++".into()),
        ]
        .into_iter()
        .collect();
        build_plan(&[block], None).unwrap()
    }

    fn executor(dir: &Path, resume: bool, keep_going: bool) -> Executor {
        let env = BenchmarkEnvironment::new(dir.into(), dir.into(), None, dir);
        let store = ResultStore::open(dir.join("results.jsonl"), resume).unwrap();
        let config = ExecutionConfig {
            keep_going,
            ..Default::default()
        };
        Executor {
            describe: with_compiler_name,
            factory: constant,
            ..Executor::new(config, env, store, dir)
        }
    }

    #[test]
    fn test_records_described_benchmarks() {
        let dir = tempfile::tempdir().unwrap();
        let summary = executor(dir.path(), false, false)
            .execute(&plan(&["a", "b"]))
            .unwrap();
        assert_eq!(summary.completed, 2);
        let records = load_records(&dir.path().join("results.jsonl")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].benchmark.get_str("compiler_name"), Some("GCC 12.2.0"));
        assert_eq!(records[1].results["compile_time"].rounded.lo, 2.0);
    }

    #[test]
    fn test_resume_skips_everything_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        executor(dir.path(), false, false)
            .execute(&plan(&["a", "b"]))
            .unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let summary = executor(dir.path(), true, false)
            .execute(&plan(&["a", "b"]))
            .unwrap();
        assert_eq!((summary.completed, summary.skipped), (0, 2));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_fail_fast_and_keep_going() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path(), false, false)
            .execute(&plan(&["a", "broken", "c"]))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("make failed"));

        let summary = executor(dir.path(), false, true)
            .execute(&plan(&["a", "broken", "c"]))
            .unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0.get_str("name"), Some("broken"));
    }
}
