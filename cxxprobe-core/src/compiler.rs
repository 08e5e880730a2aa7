//! Compiler Driver
//!
//! A thin, dialect-aware wrapper around a C++ compiler executable. Two
//! dialects are supported: POSIX-style drivers (GCC, Clang) and MSVC's `cl`.
//! The dialect only decides how flags are spelled and where diagnostics show
//! up; the operations are the same.

use crate::command::{
    output_head, run_command, CommandEnv, CommandError, CommandLine, OUTPUT_HEAD_LINES,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Compiler command-line dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    /// GCC/Clang style flags, diagnostics on stderr
    #[default]
    Posix,
    /// MSVC `cl` style flags, diagnostics on stdout
    Msvc,
}

impl CompilerFamily {
    /// Parse a configure-time dialect name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "posix" | "gcc" | "clang" | "gnu" => Some(CompilerFamily::Posix),
            "msvc" | "cl" => Some(CompilerFamily::Msvc),
            _ => None,
        }
    }

    /// Whether this is the MSVC dialect
    pub fn is_msvc(self) -> bool {
        self == CompilerFamily::Msvc
    }

    /// Flag turning warnings into errors
    pub fn warnings_as_errors_flag(self) -> &'static str {
        match self {
            CompilerFamily::Posix => "-Werror",
            CompilerFamily::Msvc => "/WX",
        }
    }

    /// Flag disabling warnings-as-errors
    pub fn suppress_warnings_flag(self) -> &'static str {
        match self {
            CompilerFamily::Posix => "-Wno-error",
            CompilerFamily::Msvc => "/WX:NO",
        }
    }

    /// Flag silencing deprecation warnings
    pub fn suppress_deprecation_flag(self) -> &'static str {
        match self {
            CompilerFamily::Posix => "-Wno-deprecated-declarations",
            CompilerFamily::Msvc => "/wd4996",
        }
    }

    /// Include-directory flag
    pub fn include_flag(self, dir: &Path) -> String {
        format!("-I{}", dir.display())
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerFamily::Posix => write!(f, "posix"),
            CompilerFamily::Msvc => write!(f, "msvc"),
        }
    }
}

/// A compile that failed, with only the diagnostic stream that matters for
/// the dialect (stderr on POSIX, stdout on MSVC)
#[derive(Debug, Clone)]
pub struct CompilationFailure {
    /// The compiler invocation
    pub command: CommandLine,
    /// Diagnostic output
    pub message: String,
}

impl fmt::Display for CompilationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ran command: {}", self.command.reproduce())?;
        writeln!(f, "Error message:")?;
        write!(f, "{}", output_head(&self.message, OUTPUT_HEAD_LINES))
    }
}

/// Errors from the compiler driver
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler ran and rejected the input
    #[error("Compilation failed.\n{0}")]
    Failed(Box<CompilationFailure>),

    /// The compiler could not be run
    #[error(transparent)]
    Command(CommandError),
}

impl CompileError {
    /// The failure record, if the compiler ran
    pub fn failure(&self) -> Option<&CompilationFailure> {
        match self {
            CompileError::Failed(failure) => Some(failure),
            CompileError::Command(_) => None,
        }
    }
}

/// A configured compiler
#[derive(Debug, Clone)]
pub struct Compiler {
    /// Compiler executable
    pub executable: PathBuf,
    /// Command-line dialect
    pub family: CompilerFamily,
    /// Standard flags prepended to every invocation
    pub std_flags: Vec<String>,
    /// Environment for the compiler process
    pub env: CommandEnv,
    /// Working directory for the compiler process
    pub cwd: PathBuf,
}

impl Compiler {
    /// Create a compiler with no standard flags, running in the current
    /// directory with a snapshot of the current environment
    pub fn new(executable: impl Into<PathBuf>, family: CompilerFamily) -> Self {
        Self {
            executable: executable.into(),
            family,
            std_flags: Vec::new(),
            env: CommandEnv::capture(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Set the standard flags
    #[must_use]
    pub fn with_std_flags(mut self, flags: Vec<String>) -> Self {
        self.std_flags = flags;
        self
    }

    /// Set the compiler environment
    #[must_use]
    pub fn with_env(mut self, env: CommandEnv) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Build the command line: standard flags, include dirs, warning policy,
    /// then the operation's own arguments
    pub fn command_line(&self, include_dirs: &[PathBuf], args: Vec<String>) -> CommandLine {
        let mut all_args = self.std_flags.clone();
        all_args.extend(include_dirs.iter().map(|dir| self.family.include_flag(dir)));
        if !self.family.is_msvc() {
            all_args.push("-g0".to_string());
        }
        all_args.push(self.family.warnings_as_errors_flag().to_string());
        all_args.extend(args);

        CommandLine::new(&self.executable)
            .args(all_args)
            .cwd(&self.cwd)
            .env(self.env.clone())
    }

    fn compile(
        &self,
        include_dirs: &[PathBuf],
        args: Vec<String>,
    ) -> Result<CommandLine, CompileError> {
        let command = self.command_line(include_dirs, args);
        match run_command(&command) {
            Ok(_) => Ok(command),
            Err(CommandError::Failed(failure)) => {
                let failure = *failure;
                let message = if self.family.is_msvc() {
                    failure.stdout
                } else {
                    failure.stderr
                };
                Err(CompileError::Failed(Box::new(CompilationFailure {
                    command: failure.command,
                    message,
                })))
            }
            Err(err) => Err(CompileError::Command(err)),
        }
    }

    /// Compile a source file without producing any output file.
    ///
    /// Returns the invocation that ran.
    pub fn compile_discard(
        &self,
        source: &Path,
        include_dirs: &[PathBuf],
        args: &[String],
    ) -> Result<CommandLine, CompileError> {
        let source = source.display().to_string();
        let mut all_args = match self.family {
            CompilerFamily::Posix => {
                let null = if cfg!(windows) { "NUL" } else { "/dev/null" };
                vec!["-c".to_string(), source, "-o".to_string(), null.to_string()]
            }
            CompilerFamily::Msvc => vec!["/c".to_string(), source],
        };
        all_args.extend(args.iter().cloned());
        self.compile(include_dirs, all_args)
    }

    /// Compile and link a source file into an executable.
    ///
    /// Returns the invocation that ran.
    pub fn compile_and_link(
        &self,
        source: &Path,
        include_dirs: &[PathBuf],
        output: &Path,
        linker_flags: &[String],
        args: &[String],
    ) -> Result<CommandLine, CompileError> {
        let mut all_args = vec![source.display().to_string()];
        all_args.extend(linker_flags.iter().cloned());
        all_args.extend(args.iter().cloned());
        match self.family {
            CompilerFamily::Posix => {
                all_args.push("-o".to_string());
                all_args.push(output.display().to_string());
            }
            CompilerFamily::Msvc => all_args.push(format!("/Fe{}", output.display())),
        }
        self.compile(include_dirs, all_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_failure_renders_head_only() {
        let failure = CompilationFailure {
            command: CommandLine::new("g++").arg("main.cpp"),
            message: (1..=60).map(|i| format!("main.cpp:{}: error: e{}\n", i, i)).collect(),
        };
        let rendered = failure.to_string();
        assert!(rendered.contains("main.cpp:40: error: e40"));
        assert!(!rendered.contains("e41"));
        assert!(rendered.contains("[20 more line(s) omitted]"));
    }

    #[test]
    fn test_family_flags() {
        assert_eq!(CompilerFamily::Posix.warnings_as_errors_flag(), "-Werror");
        assert_eq!(CompilerFamily::Msvc.warnings_as_errors_flag(), "/WX");
        assert_eq!(CompilerFamily::Posix.suppress_warnings_flag(), "-Wno-error");
        assert_eq!(CompilerFamily::Msvc.suppress_warnings_flag(), "/WX:NO");
        assert_eq!(
            CompilerFamily::Posix.suppress_deprecation_flag(),
            "-Wno-deprecated-declarations"
        );
        assert_eq!(CompilerFamily::Msvc.suppress_deprecation_flag(), "/wd4996");
    }

    #[test]
    fn test_family_from_name() {
        assert_eq!(CompilerFamily::from_name("GCC"), Some(CompilerFamily::Posix));
        assert_eq!(CompilerFamily::from_name("msvc"), Some(CompilerFamily::Msvc));
        assert_eq!(CompilerFamily::from_name("icc"), None);
    }

    #[test]
    fn test_posix_command_line_order() {
        let compiler = Compiler::new("g++", CompilerFamily::Posix)
            .with_std_flags(vec!["-std=c++11".to_string()])
            .with_env(CommandEnv::empty())
            .with_cwd("/work");
        let cmd = compiler.command_line(
            &[PathBuf::from("/inc")],
            vec!["-c".to_string(), "a.cpp".to_string()],
        );
        assert_eq!(cmd.args, vec!["-std=c++11", "-I/inc", "-g0", "-Werror", "-c", "a.cpp"]);
        assert_eq!(cmd.cwd, PathBuf::from("/work"));
    }

    #[test]
    fn test_msvc_command_line_has_no_debug_flag() {
        let compiler = Compiler::new("cl", CompilerFamily::Msvc).with_env(CommandEnv::empty());
        let cmd = compiler.command_line(&[], vec!["/c".to_string(), "a.cpp".to_string()]);
        assert_eq!(cmd.args, vec!["/WX", "/c", "a.cpp"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_posix_failure_message_is_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fakecxx");
        std::fs::write(&script, "#!/bin/sh\necho to-stdout\necho to-stderr >&2\nexit 1\n").unwrap();

        let compiler = fake_compiler(&script, CompilerFamily::Posix).with_cwd(dir.path());
        let err = compiler
            .compile_discard(Path::new("x.cpp"), &[], &[])
            .unwrap_err();
        let failure = err.failure().expect("compiler ran");
        assert_eq!(failure.message, "to-stderr\n");
        assert!(failure.command.args.contains(&"/dev/null".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_msvc_failure_message_is_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fakecl");
        std::fs::write(&script, "#!/bin/sh\necho to-stdout\necho to-stderr >&2\nexit 2\n").unwrap();

        let compiler = fake_compiler(&script, CompilerFamily::Msvc).with_cwd(dir.path());
        let err = compiler
            .compile_and_link(Path::new("x.cpp"), &[], Path::new("x.exe"), &[], &[])
            .unwrap_err();
        let failure = err.failure().expect("compiler ran");
        assert_eq!(failure.message, "to-stdout\n");
        assert_eq!(failure.command.args.last().map(String::as_str), Some("/Fex.exe"));
    }

    /// Run the script through `/bin/sh` so it never needs an exec bit
    #[cfg(unix)]
    fn fake_compiler(script: &Path, family: CompilerFamily) -> Compiler {
        Compiler::new("/bin/sh", family).with_std_flags(vec![script.display().to_string()])
    }
}
