//! Results tables: pivot records into `(row, column) -> interval` cells

use crate::definition::TableDefinition;
use crate::error::ReportError;
use crate::record::{BenchmarkRecord, MetricInterval};
use cxxprobe_core::{DimensionValue, ParameterMapping};
use std::collections::{BTreeMap, BTreeSet};

/// A filled-in table
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    /// Row values in ascending order
    pub rows: Vec<DimensionValue>,
    /// Column values in ascending order
    pub columns: Vec<DimensionValue>,
    cells: BTreeMap<(DimensionValue, DimensionValue), Cell>,
}

#[derive(Debug, Clone)]
struct Cell {
    interval: MetricInterval,
    remaining: ParameterMapping,
}

impl ResultsTable {
    /// Interval at `(row, column)`
    pub fn get(&self, row: &DimensionValue, column: &DimensionValue) -> Option<&MetricInterval> {
        self.cells
            .get(&(row.clone(), column.clone()))
            .map(|cell| &cell.interval)
    }

    /// Every interval in the table
    pub fn intervals(&self) -> impl Iterator<Item = &MetricInterval> {
        self.cells.values().map(|cell| &cell.interval)
    }

    /// Whether the table has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Whether `benchmark` satisfies every filter entry. A scalar filter value
/// also matches a tuple dimension containing it.
pub fn matches_filter(benchmark: &ParameterMapping, filter: &ParameterMapping) -> bool {
    filter.iter().all(|(name, wanted)| {
        benchmark
            .get(name)
            .is_some_and(|actual| actual.contains_or_equals(wanted))
    })
}

/// Pivot `records` into the table described by `definition`.
///
/// Each cell must come from exactly one record; a second record for the same
/// cell is a [`ReportError::ResultConflict`] naming the dimensions in which
/// the two records differ.
pub fn build_table(
    definition: &TableDefinition,
    records: &[BenchmarkRecord],
) -> Result<ResultsTable, ReportError> {
    let metric = &definition.results.dimension;
    let row_dim = &definition.rows.dimension;
    let col_dim = &definition.columns.dimension;

    let mut cells: BTreeMap<(DimensionValue, DimensionValue), Cell> = BTreeMap::new();
    let mut rows = BTreeSet::new();
    let mut columns = BTreeSet::new();

    for record in records {
        if !matches_filter(&record.benchmark, &definition.benchmark_filter) {
            continue;
        }
        let Some(interval) = record.results.get(metric) else {
            continue;
        };

        let dimension_of = |name: &String| {
            record
                .benchmark
                .get(name)
                .cloned()
                .ok_or_else(|| ReportError::MissingDimension {
                    table: definition.name.clone(),
                    dimension: name.clone(),
                    benchmark: record.benchmark.clone(),
                })
        };
        let row = dimension_of(row_dim)?;
        let column = dimension_of(col_dim)?;

        let remaining = record.benchmark.without(
            definition
                .benchmark_filter
                .keys()
                .map(String::as_str)
                .chain([row_dim.as_str(), col_dim.as_str()]),
        );

        if let Some(existing) = cells.get(&(row.clone(), column.clone())) {
            return Err(ReportError::ResultConflict {
                table: definition.name.clone(),
                row,
                column,
                first: existing.remaining.clone(),
                second: remaining,
            });
        }

        rows.insert(row.clone());
        columns.insert(column.clone());
        cells.insert(
            (row, column),
            Cell {
                interval: *interval,
                remaining,
            },
        );
    }

    Ok(ResultsTable {
        rows: rows.into_iter().collect(),
        columns: columns.into_iter().collect(),
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AxisDefinition, ResultsDefinition};
    use crate::record::Interval;
    use crate::units::UnitKind;

    fn definition(filter: ParameterMapping) -> TableDefinition {
        TableDefinition {
            name: "Compile time".to_string(),
            benchmark_filter: filter,
            rows: AxisDefinition {
                dimension: "compiler_name".to_string(),
                pretty_printer: None,
            },
            columns: AxisDefinition {
                dimension: "num_classes".to_string(),
                pretty_printer: None,
            },
            results: ResultsDefinition {
                dimension: "compile_time".to_string(),
                unit: UnitKind::Seconds,
            },
        }
    }

    fn record(benchmark: ParameterMapping, value: f64) -> BenchmarkRecord {
        let mut results = BTreeMap::new();
        results.insert(
            "compile_time".to_string(),
            MetricInterval {
                raw: Interval::new(value, value),
                rounded: Interval::new(value, value),
            },
        );
        BenchmarkRecord { benchmark, results }
    }

    fn bench(name: &str, compiler: &str, classes: i64) -> ParameterMapping {
        ParameterMapping::new()
            .with("name", name)
            .with("compiler_name", compiler)
            .with("num_classes", classes)
            .with("additional_cmake_args", vec!["-DFRUIT_USES_BOOST=False"])
    }

    #[test]
    fn test_pivot_sorted_axes() {
        let filter = ParameterMapping::new().with("name", "fruit_compile_time");
        let records = vec![
            record(bench("fruit_compile_time", "GCC 12", 1000), 3.0),
            record(bench("fruit_compile_time", "Clang 16", 100), 1.0),
            record(bench("boost_di_compile_time", "Clang 16", 100), 9.0),
        ];
        let table = build_table(&definition(filter), &records).unwrap();
        assert_eq!(table.rows, vec!["Clang 16".into(), "GCC 12".into()]);
        assert_eq!(table.columns, vec![DimensionValue::Int(100), DimensionValue::Int(1000)]);
        assert_eq!(
            table.get(&"Clang 16".into(), &DimensionValue::Int(100)).unwrap().raw.lo,
            1.0
        );
        assert!(table.get(&"GCC 12".into(), &DimensionValue::Int(100)).is_none());
    }

    #[test]
    fn test_scalar_filter_matches_tuple_member() {
        let filter = ParameterMapping::new().with("additional_cmake_args", "-DFRUIT_USES_BOOST=False");
        let records = vec![record(bench("fruit_compile_time", "GCC 12", 100), 2.0)];
        let table = build_table(&definition(filter), &records).unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_records_without_metric_are_skipped() {
        let mut other = record(bench("fruit_run_time", "GCC 12", 100), 2.0);
        other.results = BTreeMap::new();
        let table = build_table(&definition(ParameterMapping::new()), &[other]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_conflict_names_remaining_dimensions() {
        let records = vec![
            record(bench("fruit_compile_time", "GCC 12", 100), 2.0),
            record(bench("boost_di_compile_time", "GCC 12", 100), 5.0),
        ];
        let err = build_table(&definition(ParameterMapping::new()), &records).unwrap_err();
        match &err {
            ReportError::ResultConflict { first, second, .. } => {
                assert_eq!(first.get_str("name"), Some("fruit_compile_time"));
                assert_eq!(second.get_str("name"), Some("boost_di_compile_time"));
                assert!(!first.contains("compiler_name"));
            }
            other => panic!("unexpected: {}", other),
        }
        assert!(err.to_string().contains("boost_di_compile_time"));
    }

    #[test]
    fn test_missing_row_dimension() {
        let benchmark = ParameterMapping::new().with("name", "x").with("num_classes", 100);
        let err = build_table(&definition(ParameterMapping::new()), &[record(benchmark, 1.0)])
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingDimension { ref dimension, .. } if dimension == "compiler_name"));
    }
}
