//! Convergence Loop
//!
//! Runs one benchmark until every metric's 95% interval is stable at two
//! significant digits, `max_runs` is reached, or the wall-clock budget runs
//! out. A timeout is a warning: the partially converged intervals are still
//! returned.

use cxxprobe_core::ParameterMapping;
use cxxprobe_report::MetricInterval;
use cxxprobe_stats::{Convergence, assess_convergence, estimate};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Measurements of one run, by metric name
pub type Measurements = BTreeMap<String, f64>;

/// A benchmark the runner can drive
pub trait Benchmark {
    /// One-time setup before the first run
    fn prepare(&mut self) -> anyhow::Result<()>;
    /// Perform one measurement
    fn run(&mut self) -> anyhow::Result<Measurements>;
    /// Parameters identifying this benchmark
    fn describe(&self) -> &ParameterMapping;
}

/// Stopping rules for the convergence loop
#[derive(Debug, Clone)]
pub struct ConvergenceConfig {
    /// Runs performed unconditionally
    pub min_runs: usize,
    /// No further runs once a metric has this many samples
    pub max_runs: usize,
    /// Budget for the loop, measured after `prepare`
    pub timeout: Duration,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            min_runs: 3,
            max_runs: 10,
            timeout: Duration::from_secs(2 * 3600),
        }
    }
}

/// Result of driving one benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Raw and rounded interval per metric
    pub results: BTreeMap<String, MetricInterval>,
    /// Number of `run()` calls
    pub runs: usize,
    /// Whether the wall-clock budget stopped the loop
    pub timed_out: bool,
}

fn record_run(
    benchmark: &mut dyn Benchmark,
    samples: &mut BTreeMap<String, Vec<f64>>,
) -> anyhow::Result<()> {
    let measurements = benchmark.run()?;
    info!("Run result: {:?}", measurements);
    for (metric, value) in measurements {
        samples.entry(metric).or_default().push(value);
    }
    Ok(())
}

/// The first metric that still needs more runs, if any.
///
/// Metrics that reached `max_runs` without stabilizing are reported once and
/// no longer hold the loop open.
fn next_unstable(
    samples: &BTreeMap<String, Vec<f64>>,
    max_runs: usize,
) -> Option<(&str, MetricInterval)> {
    for (metric, values) in samples {
        let Convergence::Unstable(est) = assess_convergence(values) else {
            continue;
        };
        if values.len() < max_runs {
            return Some((metric, est.into()));
        }
        warn!(
            "Could not determine a precise result for metric {}: interval [{:.3}, {:.3}]",
            metric, est.raw.lower, est.raw.upper
        );
    }
    None
}

/// Prepare and run `benchmark` until its metrics converge
pub fn run_until_converged(
    benchmark: &mut dyn Benchmark,
    config: &ConvergenceConfig,
) -> anyhow::Result<RunOutcome> {
    info!("Preparing {}", benchmark.describe());
    benchmark.prepare()?;

    let start = Instant::now();
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut runs = 0;
    for _ in 0..config.min_runs {
        record_run(benchmark, &mut samples)?;
        runs += 1;
    }

    let mut timed_out = false;
    loop {
        if start.elapsed() >= config.timeout {
            warn!(
                "Timed out after {} run(s) of {}; recording the current intervals",
                runs,
                benchmark.describe()
            );
            timed_out = true;
            break;
        }
        match next_unstable(&samples, config.max_runs) {
            Some((metric, interval)) => info!(
                "Running again for more precision on metric {}: interval [{:.3}, {:.3}]",
                metric, interval.raw.lo, interval.raw.hi
            ),
            None => break,
        }
        record_run(benchmark, &mut samples)?;
        runs += 1;
    }

    let results: BTreeMap<String, MetricInterval> = samples
        .iter()
        .filter_map(|(metric, values)| {
            estimate(values).map(|est| (metric.clone(), MetricInterval::from(est)))
        })
        .collect();
    info!("Finished after {} run(s): {:?}", runs, rounded_summary(&results));

    Ok(RunOutcome {
        results,
        runs,
        timed_out,
    })
}

fn rounded_summary(results: &BTreeMap<String, MetricInterval>) -> BTreeMap<&str, (f64, f64)> {
    results
        .iter()
        .map(|(metric, interval)| (metric.as_str(), (interval.rounded.lo, interval.rounded.hi)))
        .collect()
}
