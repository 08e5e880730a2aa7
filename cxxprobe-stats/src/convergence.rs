//! Convergence Assessment
//!
//! A metric has converged once both endpoints of its 95% interval round to
//! the same value at the published precision. Bit-identical samples are
//! converged without computing an interval.

use crate::DEFAULT_SIGNIFICANT_DIGITS;
use crate::interval::{ConfidenceInterval, confidence_interval};
use crate::rounding::round_interval;
use crate::summary::all_identical;

/// Raw and rounded interval for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricEstimate {
    /// Unrounded 95% interval
    pub raw: ConfidenceInterval,
    /// Interval with each endpoint rounded to the published precision
    pub rounded: ConfidenceInterval,
}

impl MetricEstimate {
    /// Whether the rounded endpoints coincide
    pub fn is_stable(&self) -> bool {
        (self.rounded.upper - self.rounded.lower).abs() <= 10.0 * f64::EPSILON
    }
}

/// Outcome of assessing one metric's samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convergence {
    /// Every sample is bit-identical
    Identical,
    /// Rounded endpoints agree
    Converged(MetricEstimate),
    /// Rounded endpoints still differ
    Unstable(MetricEstimate),
}

impl Convergence {
    /// Whether another run would be useful
    pub fn needs_more_runs(&self) -> bool {
        matches!(self, Convergence::Unstable(_))
    }
}

/// Raw and rounded 95% interval. `None` for an empty sample.
pub fn estimate(samples: &[f64]) -> Option<MetricEstimate> {
    let raw = confidence_interval(samples)?;
    Some(MetricEstimate {
        raw,
        rounded: round_interval(&raw, DEFAULT_SIGNIFICANT_DIGITS),
    })
}

/// Decide whether `samples` have converged
pub fn assess_convergence(samples: &[f64]) -> Convergence {
    if all_identical(samples) {
        return Convergence::Identical;
    }
    match estimate(samples) {
        Some(est) if est.is_stable() => Convergence::Converged(est),
        Some(est) => Convergence::Unstable(est),
        None => Convergence::Identical,
    }
}
