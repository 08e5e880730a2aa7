#![warn(missing_docs)]
//! cxxprobe Core - Toolchain Runtime
//!
//! This crate provides the process-level plumbing shared by the assertion
//! engine and the benchmark driver:
//! - `run_command` with an explicit, reproducible child environment
//! - `Compiler` over POSIX and MSVC command-line dialects
//! - Temp artifact helpers with best-effort cleanup
//! - Memoized compiler identity and repository introspection
//! - `ParameterMapping`, the named parameter set used for test cases and benchmark runs

mod artifacts;
mod command;
mod compiler;
mod introspect;
mod params;

pub use artifacts::{
    EXECUTABLE_SUFFIX, SOURCE_SUFFIX, create_temp_file, ensure_empty_dir, reserve_executable_path,
    try_remove,
};
pub use command::{
    CommandEnv, CommandError, CommandFailure, CommandLine, CommandOutput, OUTPUT_HEAD_LINES,
    output_head, run_command,
};
pub use compiler::{CompilationFailure, CompileError, Compiler, CompilerFamily};
pub use introspect::{IntrospectionError, RepoInfo, compiler_identity, repo_info};
pub use params::{DimensionValue, ParameterMapping};
