//! Report errors

use cxxprobe_core::{DimensionValue, ParameterMapping};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the result store and the table formatter
#[derive(Debug, Error)]
pub enum ReportError {
    /// File system error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A results line is not a valid record
    #[error("Invalid result record at {path}:{line}: {source}")]
    Json {
        /// Results file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized
    #[error("Could not serialize result record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A table definition file is not valid YAML for the expected shape
    #[error("Invalid table definition file {path}: {source}")]
    Yaml {
        /// Definition file
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// Two records map to the same table cell
    #[error(
        "Table '{table}': multiple results for row {row}, column {column}. \
         Add a benchmark_filter for the dimensions that differ.\n  first:  {first}\n  second: {second}"
    )]
    ResultConflict {
        /// Table name
        table: String,
        /// Row value
        row: DimensionValue,
        /// Column value
        column: DimensionValue,
        /// Remaining dimensions of the first record
        first: ParameterMapping,
        /// Remaining dimensions of the second record
        second: ParameterMapping,
    },

    /// A retained record lacks the row or column dimension
    #[error("Table '{table}': benchmark {benchmark} has no dimension '{dimension}'")]
    MissingDimension {
        /// Table name
        table: String,
        /// Missing dimension
        dimension: String,
        /// The record's parameters
        benchmark: ParameterMapping,
    },

    /// A results unit other than `seconds` or `bytes`
    #[error("Unknown unit '{0}' (expected 'seconds' or 'bytes')")]
    UnknownUnit(String),

    /// A value has no entry in a `fixed_map` pretty printer
    #[error("No fixed_map entry for value '{value}' of dimension '{dimension}'")]
    UnmappedValue {
        /// Dimension being printed
        dimension: String,
        /// Unmapped value
        value: DimensionValue,
    },

    /// A pretty printer that is neither `format_string` nor `fixed_map`
    #[error("Invalid pretty_printer for dimension '{dimension}': {reason}")]
    InvalidPrettyPrinter {
        /// Dimension being printed
        dimension: String,
        /// What is wrong
        reason: String,
    },
}
