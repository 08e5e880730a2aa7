#![warn(missing_docs)]
//! cxxprobe Check - Compile-Time Assertion Engine
//!
//! Writes C++ test sources on the fly, compiles them with a configured
//! toolchain and checks the outcome:
//! - programs that must build and run cleanly
//! - programs that must fail to compile with a specific library error type
//!   and static assertion message near the top of the diagnostics
//! - programs that must fail at runtime with matching stderr
//!
//! Diagnostics are canonicalized before matching so one expected pattern
//! works across GCC, Clang and MSVC.

mod config;
mod diagnostics;
mod engine;
mod error;
mod params;
mod source;

pub use config::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, CompilerConfig, CoverageConfig, DiagnosticsConfig,
    HarnessConfig, RuntimeConfig, SanitizersConfig,
};
pub use diagnostics::{
    DiagnosticPatterns, Located, find_first, normalize_line, normalize_lines, splice_context,
};
pub use engine::{ExpectOptions, Harness};
pub use error::{CaseFailure, CheckError, ExpectationUnmet};
pub use params::parametrize;
pub use source::{SourceFragment, dedent, substitute_params};
