//! Benchmark result records
//!
//! One record per completed benchmark:
//! `{"benchmark": {dim: value, ...}, "results": {metric: [[raw_lo, raw_hi], [rounded_lo, rounded_hi]]}}`

use cxxprobe_core::ParameterMapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A closed interval, serialized as `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Interval {
    /// Lower bound
    pub lo: f64,
    /// Upper bound
    pub hi: f64,
}

impl Interval {
    /// Create an interval
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

impl From<(f64, f64)> for Interval {
    fn from((lo, hi): (f64, f64)) -> Self {
        Self { lo, hi }
    }
}

impl From<Interval> for (f64, f64) {
    fn from(interval: Interval) -> Self {
        (interval.lo, interval.hi)
    }
}

/// Raw and rounded 95% interval of one metric, serialized as
/// `[[raw_lo, raw_hi], [rounded_lo, rounded_hi]]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Interval, Interval)", into = "(Interval, Interval)")]
pub struct MetricInterval {
    /// Unrounded interval
    pub raw: Interval,
    /// Interval rounded to the published precision
    pub rounded: Interval,
}

impl From<(Interval, Interval)> for MetricInterval {
    fn from((raw, rounded): (Interval, Interval)) -> Self {
        Self { raw, rounded }
    }
}

impl From<MetricInterval> for (Interval, Interval) {
    fn from(metric: MetricInterval) -> Self {
        (metric.raw, metric.rounded)
    }
}

impl From<cxxprobe_stats::MetricEstimate> for MetricInterval {
    fn from(estimate: cxxprobe_stats::MetricEstimate) -> Self {
        Self {
            raw: estimate.raw.as_pair().into(),
            rounded: estimate.rounded.as_pair().into(),
        }
    }
}

/// One completed benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Parameters that identify the benchmark, including synthetic ones
    pub benchmark: ParameterMapping,
    /// Per-metric intervals
    pub results: BTreeMap<String, MetricInterval>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let mut results = BTreeMap::new();
        results.insert(
            "compile_time".to_string(),
            MetricInterval {
                raw: Interval::new(9.5, 10.25),
                rounded: Interval::new(9.5, 10.0),
            },
        );
        let record = BenchmarkRecord {
            benchmark: ParameterMapping::new()
                .with("name", "fruit_compile_time")
                .with("num_classes", 100),
            results,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"benchmark":{"name":"fruit_compile_time","num_classes":100},"results":{"compile_time":[[9.5,10.25],[9.5,10.0]]}}"#
        );
        let back: BenchmarkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_integer_bounds_parse() {
        let record: BenchmarkRecord = serde_json::from_str(
            r#"{"benchmark":{"name":"x"},"results":{"num_bytes":[[1024,1024],[1000,1000]]}}"#,
        )
        .unwrap();
        assert_eq!(record.results["num_bytes"].rounded, Interval::new(1000.0, 1000.0));
    }
}
