//! Table definitions
//!
//! ```yaml
//! tables:
//!   - name: "Fruit compile time (single file)"
//!     benchmark_filter:
//!       name: fruit_single_file_compile_time
//!     rows:
//!       dimension: compiler_name
//!     columns:
//!       dimension: num_bindings
//!       pretty_printer:
//!         format_string: "%s bindings"
//!     results:
//!       dimension: compile_time
//!       unit: seconds
//! ```

use crate::error::ReportError;
use crate::units::UnitKind;
use cxxprobe_core::{DimensionValue, ParameterMapping};
use serde::Deserialize;
use std::path::Path;

/// Turns a dimension value into a row or column label
#[derive(Debug, Clone, PartialEq)]
pub enum PrettyPrinter {
    /// Replace `%s` with the value
    FormatString(String),
    /// Look the value up; unmapped values are an error
    FixedMap(Vec<(DimensionValue, String)>),
}

impl PrettyPrinter {
    /// Label for `value` of `dimension`
    pub fn print(&self, dimension: &str, value: &DimensionValue) -> Result<String, ReportError> {
        match self {
            PrettyPrinter::FormatString(format) => Ok(format.replace("%s", &value.to_string())),
            PrettyPrinter::FixedMap(entries) => entries
                .iter()
                .find(|(from, _)| from == value)
                .map(|(_, to)| to.clone())
                .ok_or_else(|| ReportError::UnmappedValue {
                    dimension: dimension.to_string(),
                    value: value.clone(),
                }),
        }
    }
}

/// Row or column axis of a table
#[derive(Debug, Clone, PartialEq)]
pub struct AxisDefinition {
    /// Dimension providing the axis values
    pub dimension: String,
    /// Label printer; values print as-is without one
    pub pretty_printer: Option<PrettyPrinter>,
}

impl AxisDefinition {
    /// Label for `value`
    pub fn label(&self, value: &DimensionValue) -> Result<String, ReportError> {
        match &self.pretty_printer {
            Some(printer) => printer.print(&self.dimension, value),
            None => Ok(value.to_string()),
        }
    }
}

/// Metric shown in the cells
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsDefinition {
    /// Metric name
    pub dimension: String,
    /// Unit ladder for display
    pub unit: UnitKind,
}

/// One output table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    /// Table title
    pub name: String,
    /// Dimensions every shown record must match
    pub benchmark_filter: ParameterMapping,
    /// Row axis
    pub rows: AxisDefinition,
    /// Column axis
    pub columns: AxisDefinition,
    /// Cell metric
    pub results: ResultsDefinition,
}

#[derive(Deserialize)]
struct RawTablesFile {
    tables: Vec<RawTable>,
}

#[derive(Deserialize)]
struct RawTable {
    name: String,
    #[serde(default)]
    benchmark_filter: ParameterMapping,
    rows: RawAxis,
    columns: RawAxis,
    results: RawResults,
}

#[derive(Deserialize)]
struct RawAxis {
    dimension: String,
    #[serde(default)]
    pretty_printer: Option<RawPrettyPrinter>,
}

#[derive(Deserialize)]
struct RawPrettyPrinter {
    #[serde(default)]
    format_string: Option<String>,
    #[serde(default)]
    fixed_map: Option<Vec<RawFixedMapEntry>>,
}

#[derive(Deserialize)]
struct RawFixedMapEntry {
    from: DimensionValue,
    to: String,
}

#[derive(Deserialize)]
struct RawResults {
    dimension: String,
    unit: String,
}

impl RawAxis {
    fn resolve(self) -> Result<AxisDefinition, ReportError> {
        let pretty_printer = match self.pretty_printer {
            None => None,
            Some(RawPrettyPrinter {
                format_string: Some(format),
                fixed_map: None,
            }) => Some(PrettyPrinter::FormatString(format)),
            Some(RawPrettyPrinter {
                format_string: None,
                fixed_map: Some(entries),
            }) => Some(PrettyPrinter::FixedMap(
                entries.into_iter().map(|e| (e.from, e.to)).collect(),
            )),
            Some(RawPrettyPrinter {
                format_string: Some(_),
                fixed_map: Some(_),
            }) => {
                return Err(ReportError::InvalidPrettyPrinter {
                    dimension: self.dimension,
                    reason: "both format_string and fixed_map given".to_string(),
                });
            }
            Some(RawPrettyPrinter {
                format_string: None,
                fixed_map: None,
            }) => {
                return Err(ReportError::InvalidPrettyPrinter {
                    dimension: self.dimension,
                    reason: "expected format_string or fixed_map".to_string(),
                });
            }
        };
        Ok(AxisDefinition {
            dimension: self.dimension,
            pretty_printer,
        })
    }
}

impl RawTable {
    fn resolve(self) -> Result<TableDefinition, ReportError> {
        Ok(TableDefinition {
            name: self.name,
            benchmark_filter: self.benchmark_filter,
            rows: self.rows.resolve()?,
            columns: self.columns.resolve()?,
            results: ResultsDefinition {
                unit: UnitKind::parse(&self.results.unit)?,
                dimension: self.results.dimension,
            },
        })
    }
}

/// Parse and validate table definitions from YAML text
pub fn parse_table_definitions(yaml: &str, path: &Path) -> Result<Vec<TableDefinition>, ReportError> {
    let raw: RawTablesFile = serde_yaml::from_str(yaml).map_err(|source| ReportError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    raw.tables.into_iter().map(RawTable::resolve).collect()
}

/// Load and validate table definitions from a YAML file
pub fn load_table_definitions(path: &Path) -> Result<Vec<TableDefinition>, ReportError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table_definitions(&yaml, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"
tables:
  - name: "Compile time"
    benchmark_filter:
      name: fruit_compile_time
      additional_cmake_args: "-DFRUIT_USES_BOOST=False"
    rows:
      dimension: compiler_name
    columns:
      dimension: num_classes
      pretty_printer:
        format_string: "%s classes"
    results:
      dimension: compile_time
      unit: seconds
  - name: "Executable size"
    rows:
      dimension: name
      pretty_printer:
        fixed_map:
          - from: fruit_executable_size
            to: Fruit
          - from: boost_di_executable_size
            to: Boost.DI
    columns:
      dimension: num_classes
    results:
      dimension: num_bytes
      unit: bytes
"#;

    #[test]
    fn test_parse_tables() {
        let tables = parse_table_definitions(TABLES, Path::new("tables.yml")).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].benchmark_filter.get_str("name"), Some("fruit_compile_time"));
        assert_eq!(tables[0].results.unit, UnitKind::Seconds);
        assert_eq!(tables[1].results.unit, UnitKind::Bytes);
        assert!(tables[1].benchmark_filter.is_empty());
    }

    #[test]
    fn test_pretty_printers() {
        let tables = parse_table_definitions(TABLES, Path::new("tables.yml")).unwrap();
        assert_eq!(
            tables[0].columns.label(&DimensionValue::Int(100)).unwrap(),
            "100 classes"
        );
        assert_eq!(
            tables[1].rows.label(&"boost_di_executable_size".into()).unwrap(),
            "Boost.DI"
        );
        assert!(matches!(
            tables[1].rows.label(&"simple_di_executable_size".into()),
            Err(ReportError::UnmappedValue { .. })
        ));
        assert_eq!(tables[1].columns.label(&DimensionValue::Int(250)).unwrap(), "250");
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let yaml = TABLES.replace("unit: bytes", "unit: parsecs");
        assert!(matches!(
            parse_table_definitions(&yaml, Path::new("t.yml")),
            Err(ReportError::UnknownUnit(u)) if u == "parsecs"
        ));
    }

    #[test]
    fn test_unknown_pretty_printer_rejected() {
        let yaml = TABLES.replace("format_string: \"%s classes\"", "uppercase: true");
        assert!(matches!(
            parse_table_definitions(&yaml, Path::new("t.yml")),
            Err(ReportError::InvalidPrettyPrinter { .. })
        ));
    }
}
