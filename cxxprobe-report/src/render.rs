//! Markdown rendering of results tables, optionally against a baseline

use crate::definition::TableDefinition;
use crate::error::ReportError;
use crate::record::{BenchmarkRecord, Interval};
use crate::table::{ResultsTable, build_table};
use crate::units::{Unit, format_interval};
use rayon::prelude::*;

const MISSING_CELL: &str = "N/A";

fn bounds<'a>(tables: impl IntoIterator<Item = &'a ResultsTable>) -> Option<(f64, f64)> {
    tables
        .into_iter()
        .flat_map(|table| table.intervals())
        .fold(None, |acc, metric| {
            let Interval { lo, hi } = metric.rounded;
            Some(match acc {
                None => (lo, hi),
                Some((min, max)) => (f64::min(min, lo), f64::max(max, hi)),
            })
        })
}

fn format_percentage(ratio: f64) -> String {
    format!("{:+.0}%", (ratio - 1.0) * 100.0)
}

/// `baseline → current (p_min - p_max)`, with the percentage range computed
/// conservatively from opposite ends of the two intervals
fn comparison_cell(baseline: &Interval, current: &Interval, unit: &Unit) -> String {
    let base = format_interval(baseline.lo, baseline.hi, unit);
    let cur = format_interval(current.lo, current.hi, unit);
    if baseline.lo <= 0.0 || baseline.hi <= 0.0 {
        return format!("{} → {}", base, cur);
    }
    let p_min = format_percentage(current.lo / baseline.hi);
    let p_max = format_percentage(current.hi / baseline.lo);
    if p_min == p_max {
        format!("{} → {} ({})", base, cur, p_min)
    } else {
        format!("{} → {} ({} - {})", base, cur, p_min, p_max)
    }
}

/// Render one table as markdown. With a baseline, each cell shows the
/// baseline value, the current value and the relative change.
pub fn render_table(
    definition: &TableDefinition,
    table: &ResultsTable,
    baseline: Option<&ResultsTable>,
) -> Result<String, ReportError> {
    let (min, max) = bounds(std::iter::once(table).chain(baseline)).unwrap_or((0.0, 0.0));
    let unit = definition.results.unit.select(min, max);

    let mut out = format!("## {}\n", definition.name);

    out.push_str("| |");
    for column in &table.columns {
        out.push_str(&format!(" {} |", definition.columns.label(column)?));
    }
    out.push('\n');
    out.push_str(&format!("|-|{}\n", "-|".repeat(table.columns.len())));

    for row in &table.rows {
        let mut line = format!("| {} |", definition.rows.label(row)?);
        for column in &table.columns {
            let cell = match table.get(row, column) {
                None => MISSING_CELL.to_string(),
                Some(current) => {
                    let current = current.rounded;
                    match baseline.and_then(|b| b.get(row, column)) {
                        Some(base) => comparison_cell(&base.rounded, &current, &unit),
                        None => format_interval(current.lo, current.hi, &unit),
                    }
                }
            };
            line.push_str(&format!(" {} |", cell));
        }
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Build and render every table. Tables are independent, so they are built
/// in parallel; the output keeps definition order.
pub fn render_tables(
    definitions: &[TableDefinition],
    records: &[BenchmarkRecord],
    baseline_records: Option<&[BenchmarkRecord]>,
) -> Result<String, ReportError> {
    let rendered = definitions
        .par_iter()
        .map(|definition| {
            let table = build_table(definition, records)?;
            let baseline = baseline_records
                .map(|records| build_table(definition, records))
                .transpose()?;
            render_table(definition, &table, baseline.as_ref())
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AxisDefinition, PrettyPrinter, ResultsDefinition};
    use crate::record::MetricInterval;
    use crate::units::UnitKind;
    use cxxprobe_core::ParameterMapping;
    use std::collections::BTreeMap;

    fn definition() -> TableDefinition {
        TableDefinition {
            name: "Run time".to_string(),
            benchmark_filter: ParameterMapping::new().with("name", "fruit_run_time"),
            rows: AxisDefinition {
                dimension: "compiler_name".to_string(),
                pretty_printer: None,
            },
            columns: AxisDefinition {
                dimension: "num_classes".to_string(),
                pretty_printer: Some(PrettyPrinter::FormatString("%s classes".to_string())),
            },
            results: ResultsDefinition {
                dimension: "setup_time".to_string(),
                unit: UnitKind::Seconds,
            },
        }
    }

    fn record(compiler: &str, classes: i64, lo: f64, hi: f64) -> BenchmarkRecord {
        let mut results = BTreeMap::new();
        results.insert(
            "setup_time".to_string(),
            MetricInterval {
                raw: Interval::new(lo, hi),
                rounded: Interval::new(lo, hi),
            },
        );
        BenchmarkRecord {
            benchmark: ParameterMapping::new()
                .with("name", "fruit_run_time")
                .with("compiler_name", compiler)
                .with("num_classes", classes),
            results,
        }
    }

    #[test]
    fn test_single_unit_per_table() {
        let records = vec![
            record("GCC 12", 100, 50e-6, 50e-6),
            record("GCC 12", 1000, 0.001, 0.002),
            record("Clang 16", 1000, 0.9, 0.9),
        ];
        let out = render_tables(&[definition()], &records, None).unwrap();
        let expected = "\
## Run time
| | 100 classes | 1000 classes |
|-|-|-|
| Clang 16 | N/A | 900 ms |
| GCC 12 | 0.05 ms | 1-2 ms |
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_baseline_comparison() {
        let definition = definition();
        let current = build_table(&definition, &[record("GCC 12", 100, 0.011, 0.012)]).unwrap();
        let baseline = build_table(&definition, &[record("GCC 12", 100, 0.01, 0.01)]).unwrap();
        let out = render_table(&definition, &current, Some(&baseline)).unwrap();
        assert!(out.contains("| GCC 12 | 10 ms → 11-12 ms (+10% - +20%) |"), "{}", out);
    }

    #[test]
    fn test_baseline_equal_percentages_shown_once() {
        let definition = definition();
        let current = build_table(&definition, &[record("GCC 12", 100, 0.02, 0.02)]).unwrap();
        let baseline = build_table(&definition, &[record("GCC 12", 100, 0.01, 0.01)]).unwrap();
        let out = render_table(&definition, &current, Some(&baseline)).unwrap();
        assert!(out.contains("| 10 ms → 20 ms (+100%) |"), "{}", out);
    }

    #[test]
    fn test_cell_without_baseline_counterpart() {
        let definition = definition();
        let current = build_table(&definition, &[record("GCC 12", 100, 0.02, 0.02)]).unwrap();
        let baseline = build_table(&definition, &[record("GCC 12", 1000, 0.01, 0.01)]).unwrap();
        let out = render_table(&definition, &current, Some(&baseline)).unwrap();
        assert!(out.contains("| GCC 12 | 20 ms |"), "{}", out);
    }

    #[test]
    fn test_baseline_bounds_affect_unit() {
        let definition = definition();
        let current = build_table(&definition, &[record("GCC 12", 100, 2.0, 2.0)]).unwrap();
        let baseline = build_table(&definition, &[record("GCC 12", 100, 0.003, 0.003)]).unwrap();
        let out = render_table(&definition, &current, Some(&baseline)).unwrap();
        // max 2000 ms rules out ms, so seconds it is even for the 3 ms baseline
        assert!(out.contains("| GCC 12 | 0.003 s → 2 s (+66567%) |"), "{}", out);
    }

    #[test]
    fn test_empty_table_renders_header() {
        let out = render_tables(&[definition()], &[], None).unwrap();
        assert_eq!(out, "## Run time\n| |\n|-|\n");
    }
}
