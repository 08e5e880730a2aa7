//! Significant-digit rounding

use crate::interval::ConfidenceInterval;

/// Round `n` to `digits` significant digits.
///
/// Non-positive values round to zero; benchmark metrics are durations and
/// sizes, never negative.
pub fn round_to_significant_digits(n: f64, digits: u32) -> f64 {
    if n <= 0.0 || !n.is_finite() {
        return 0.0;
    }
    let decimals = digits as i32 - n.log10().floor() as i32 - 1;
    if decimals >= 0 {
        let factor = 10f64.powi(decimals);
        (n * factor).round() / factor
    } else {
        let factor = 10f64.powi(-decimals);
        (n / factor).round() * factor
    }
}

/// Round both endpoints of an interval independently
pub fn round_interval(ci: &ConfidenceInterval, digits: u32) -> ConfidenceInterval {
    ConfidenceInterval {
        lower: round_to_significant_digits(ci.lower, digits),
        upper: round_to_significant_digits(ci.upper, digits),
        level: ci.level,
    }
}
