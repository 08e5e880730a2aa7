//! Unit ladders and number formatting
//!
//! Every table uses a single display unit so its cells stay comparable. The
//! unit is picked from the range of all values shown in the table.

use crate::error::ReportError;
use cxxprobe_stats::round_to_significant_digits;

/// One rung of a unit ladder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    /// Size of the unit in base units
    pub multiplier: f64,
    /// Display name
    pub name: &'static str,
}

const SECONDS: [Unit; 3] = [
    Unit { multiplier: 1e-6, name: "μs" },
    Unit { multiplier: 1e-3, name: "ms" },
    Unit { multiplier: 1.0, name: "s" },
];

const BYTES: [Unit; 4] = [
    Unit { multiplier: 1.0, name: "bytes" },
    Unit { multiplier: 1024.0, name: "KB" },
    Unit { multiplier: 1024.0 * 1024.0, name: "MB" },
    Unit { multiplier: 1024.0 * 1024.0 * 1024.0, name: "GB" },
];

/// Quantity measured by a results column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Durations in seconds
    Seconds,
    /// Sizes in bytes
    Bytes,
}

impl UnitKind {
    /// Parse a table definition's `unit`
    pub fn parse(name: &str) -> Result<Self, ReportError> {
        match name {
            "seconds" => Ok(UnitKind::Seconds),
            "bytes" => Ok(UnitKind::Bytes),
            other => Err(ReportError::UnknownUnit(other.to_string())),
        }
    }

    /// Units from smallest to largest
    pub fn ladder(self) -> &'static [Unit] {
        match self {
            UnitKind::Seconds => &SECONDS,
            UnitKind::Bytes => &BYTES,
        }
    }

    /// Pick the display unit for values spanning `[min, max]` (base units).
    ///
    /// In order of preference, the smallest unit where:
    /// 1. both ends display within `[1, 1000)`
    /// 2. the low end displays at least 0.2 and the high end below 1000
    /// 3. the high end displays below 1000
    ///
    /// and the largest unit otherwise.
    pub fn select(self, min: f64, max: f64) -> Unit {
        let ladder = self.ladder();
        let scaled = |unit: &Unit| (min / unit.multiplier, max / unit.multiplier);

        let rules: [&dyn Fn(f64, f64) -> bool; 3] = [
            &|lo: f64, hi: f64| lo >= 1.0 && hi < 1000.0,
            &|lo: f64, hi: f64| lo >= 0.2 && hi < 1000.0,
            &|_: f64, hi: f64| hi < 1000.0,
        ];
        for rule in rules {
            if let Some(unit) = ladder.iter().find(|unit| {
                let (lo, hi) = scaled(*unit);
                rule(lo, hi)
            }) {
                return *unit;
            }
        }
        ladder[ladder.len() - 1]
    }
}

/// Format a number with two significant digits and no trailing zeros
pub fn format_number(value: f64) -> String {
    let rounded = round_to_significant_digits(value.abs(), 2);
    if rounded == 0.0 {
        return "0".to_string();
    }
    let decimals = (2 - rounded.log10().floor() as i32 - 1).max(0) as usize;
    let mut text = format!("{:.*}", decimals, rounded);
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if value < 0.0 {
        text.insert(0, '-');
    }
    text
}

/// Format `[lo, hi]` (base units) in `unit`: `1-2 ms`, or `1 ms` when both
/// ends display the same
pub fn format_interval(lo: f64, hi: f64, unit: &Unit) -> String {
    let lo = format_number(lo / unit.multiplier);
    let hi = format_number(hi / unit.multiplier);
    if lo == hi {
        format!("{} {}", lo, unit.name)
    } else {
        format!("{}-{} {}", lo, hi, unit.name)
    }
}
