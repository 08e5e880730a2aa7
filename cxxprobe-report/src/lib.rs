#![warn(missing_docs)]
//! cxxprobe Report - Result Storage and Comparison Tables
//!
//! - JSON-lines result store with resume support
//! - YAML table definitions with pretty printers
//! - Markdown tables with a single auto-selected unit per table, optionally
//!   compared against a baseline run

mod definition;
mod error;
mod record;
mod render;
mod store;
mod table;
mod units;

pub use definition::{
    AxisDefinition, PrettyPrinter, ResultsDefinition, TableDefinition, load_table_definitions,
    parse_table_definitions,
};
pub use error::ReportError;
pub use record::{BenchmarkRecord, Interval, MetricInterval};
pub use render::{render_table, render_tables};
pub use store::{ResultStore, load_records};
pub use table::{ResultsTable, build_table, matches_filter};
pub use units::{Unit, UnitKind, format_interval, format_number};
