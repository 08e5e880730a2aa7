//! Benchmark Executor
//!
//! Turns expanded benchmark mappings into measurements and result records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (from the planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Per group: describe, resume check, library build
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ benchmarks  │  Concrete prepare/run per benchmark kind
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   runner    │  Convergence loop over 95% intervals
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Batch driver and result store writes
//! - [`benchmarks`] - Benchmark kinds and the Fruit build step
//! - [`generation`] - Seeded dependency graphs and per-library sources
//! - [`makefile`] - Makefile emission for generated projects
//! - [`metadata`] - Compiler identity and commit metadata
//! - [`runner`] - The convergence loop

mod benchmarks;
mod execution;
mod generation;
mod makefile;
mod metadata;
mod runner;

// Re-export public API
pub use benchmarks::{
    BenchmarkEnvironment, GeneratedKind, build_fruit, create_benchmark, parse_measurements,
};
pub use execution::{BatchSummary, ExecutionConfig, Executor};
pub use generation::{
    DependencyGraph, DiLibrary, GRAPH_SEED, GeneratedProject, ProjectSpec, generate_files,
    write_project,
};
pub use makefile::emit_makefile;
pub use metadata::describe;
pub use runner::{Benchmark, ConvergenceConfig, Measurements, RunOutcome, run_until_converged};
