#![warn(missing_docs)]
//! cxxprobe Statistical Engine
//!
//! Small-sample statistics used to decide when a benchmark measurement is
//! stable enough to publish:
//! - Mean, sample standard deviation and standard error
//! - Two-sided Student-t confidence intervals
//! - Rounding to a fixed number of significant digits
//! - Per-metric convergence assessment

mod convergence;
mod interval;
mod rounding;
mod summary;

pub use convergence::{Convergence, MetricEstimate, assess_convergence, estimate};
pub use interval::{ConfidenceInterval, confidence_interval, t_critical_95};
pub use rounding::{round_interval, round_to_significant_digits};
pub use summary::{SampleSummary, all_identical, compute_summary};

/// Confidence level of every interval this crate produces (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Significant digits that count as "published precision"
pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 2;
