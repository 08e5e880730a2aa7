#![warn(missing_docs)]
//! # cxxprobe
//!
//! Test and benchmark tooling for header-heavy C++ libraries:
//! - **Compile-time assertions**: programs that must build, fail to compile
//!   with a given library error and static assertion, or fail at runtime
//! - **Portable diagnostics**: GCC, Clang and MSVC output canonicalized so one
//!   expected pattern works everywhere
//! - **Reproducible failures**: every failed child process carries its exact
//!   command line and environment
//! - **DI benchmarks**: generated projects for Fruit, Boost.DI and hand-written
//!   wiring, run until their 95% intervals stabilize
//! - **Comparison tables**: markdown tables with one unit per table and
//!   optional baseline deltas
//!
//! ## Quick Start
//!
//! ```ignore
//! use cxxprobe::prelude::*;
//!
//! #[test]
//! fn test_missing_binding() {
//!     let harness = Harness::from_env().unwrap();
//!     let source = SourceFragment::new(
//!         "struct X {};",
//!         "fruit::Component<X> getComponent() { return fruit::createComponent(); }",
//!     );
//!     harness
//!         .expect_compile_error(
//!             "NoBindingFoundError<X>",
//!             "No explicit binding nor C::Inject definition was found for T.",
//!             &source,
//!             &ExpectOptions::default(),
//!         )
//!         .unwrap();
//! }
//! ```
//!
//! ## Parametrized Cases
//!
//! ```ignore
//! parametrize(
//!     [params! { "XAnnot" => "X" }, params! { "XAnnot" => "fruit::Annotated<Annotation1, X>" }],
//!     |p| harness.expect_success(&SourceFragment::new(SETUP, BODY).with_params(p.clone()), &opts),
//! )?;
//! ```

// Re-export core types
pub use cxxprobe_core::{
    CommandEnv, CommandError, CommandFailure, CommandLine, CommandOutput, CompilationFailure,
    CompileError, Compiler, CompilerFamily, DimensionValue, ParameterMapping, compiler_identity,
    OUTPUT_HEAD_LINES, ensure_empty_dir, output_head, params, repo_info, run_command, try_remove,
};

// Re-export the assertion engine
pub use cxxprobe_check::{
    CaseFailure, CheckError, CompilerConfig, DiagnosticPatterns, ExpectOptions, ExpectationUnmet,
    Harness, HarnessConfig, SourceFragment, normalize_line, normalize_lines, parametrize,
};

// Re-export stats
pub use cxxprobe_stats::{Convergence, MetricEstimate, assess_convergence, estimate};

// Re-export reporting
pub use cxxprobe_report::{
    BenchmarkRecord, MetricInterval, ReportError, ResultStore, TableDefinition, load_records,
    parse_table_definitions, render_tables,
};

// Re-export the benchmark driver
pub use cxxprobe_cli::{
    Benchmark, BenchmarkDefinitionFile, ConvergenceConfig, Measurements, build_plan,
    expand_blocks, run_until_converged,
};

/// Prelude for test suites
pub mod prelude {
    pub use crate::{
        CheckError, ExpectOptions, Harness, HarnessConfig, ParameterMapping, SourceFragment,
        params, parametrize,
    };
}

/// Run the cxxprobe CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() {
///     cxxprobe::run().unwrap();
/// }
/// ```
pub use cxxprobe_cli::run;
