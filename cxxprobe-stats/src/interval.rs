//! Student-t Confidence Intervals
//!
//! Two-sided 95% interval for the mean: `mean ± t(n-1) * s / sqrt(n)`.
//! Critical values come from a table for small degrees of freedom and a
//! Cornish-Fisher expansion of the normal quantile beyond it.

use crate::DEFAULT_CONFIDENCE_LEVEL;
use crate::summary::{all_identical, compute_summary};

/// Confidence interval bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Confidence level
    pub level: f64,
}

impl ConfidenceInterval {
    /// A zero-width interval at `value`
    pub fn point(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
            level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }

    /// Width of the interval
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Bounds as a `(lower, upper)` pair
    pub fn as_pair(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

/// Two-sided 97.5% quantiles of Student's t for df = 1..=30
const T_TABLE_95: [f64; 30] = [
    12.7062, 4.3027, 3.1824, 2.7764, 2.5706, 2.4469, 2.3646, 2.3060, 2.2622, 2.2281, 2.2010,
    2.1788, 2.1604, 2.1448, 2.1314, 2.1199, 2.1098, 2.1009, 2.0930, 2.0860, 2.0796, 2.0739,
    2.0687, 2.0639, 2.0595, 2.0555, 2.0518, 2.0484, 2.0452, 2.0423,
];

/// Standard normal 97.5% quantile
const Z_975: f64 = 1.959964;

/// Critical value of the two-sided 95% Student-t interval
pub fn t_critical_95(degrees_of_freedom: usize) -> f64 {
    match degrees_of_freedom {
        0 => f64::INFINITY,
        df if df <= T_TABLE_95.len() => T_TABLE_95[df - 1],
        df => {
            let nu = df as f64;
            let z = Z_975;
            let z3 = z.powi(3);
            let z5 = z.powi(5);
            let z7 = z.powi(7);
            z + (z3 + z) / (4.0 * nu)
                + (5.0 * z5 + 16.0 * z3 + 3.0 * z) / (96.0 * nu.powi(2))
                + (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / (384.0 * nu.powi(3))
        }
    }
}

/// 95% confidence interval for the mean of `samples`.
///
/// Fewer than two samples, or bit-identical samples, collapse to the mean.
/// Returns `None` for an empty sample.
pub fn confidence_interval(samples: &[f64]) -> Option<ConfidenceInterval> {
    let summary = compute_summary(samples)?;
    if samples.len() < 2 || all_identical(samples) {
        return Some(ConfidenceInterval::point(summary.mean));
    }

    let half_width = t_critical_95(samples.len() - 1) * summary.std_error;
    Some(ConfidenceInterval {
        lower: summary.mean - half_width,
        upper: summary.mean + half_width,
        level: DEFAULT_CONFIDENCE_LEVEL,
    })
}
