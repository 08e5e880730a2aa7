//! Assertion engine errors

use cxxprobe_core::{CommandError, CommandLine, CompileError, ParameterMapping};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the assertion engine
#[derive(Debug, Error)]
pub enum CheckError {
    /// The test ran but the expected outcome did not happen
    #[error("{0}")]
    ExpectationUnmet(Box<ExpectationUnmet>),

    /// A compiled test executable failed, or a helper tool could not run
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The compiler failed where success was required, or could not run
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A pattern did not compile
    #[error("Invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        /// Offending pattern
        pattern: String,
        /// Regex compiler error
        #[source]
        source: regex::Error,
    },

    /// An expectation that can never be checked (e.g. a multi-line regex
    /// against single diagnostic lines)
    #[error("Invalid expectation: {0}")]
    InvalidExpectation(String),

    /// File system error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid harness configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Compiler output had an unexpected shape
    #[error("Malformed diagnostic: {0}")]
    Diagnostic(String),

    /// One or more parametrized cases failed
    #[error("{}", render_case_failures(.0))]
    Parametrized(Vec<CaseFailure>),
}

impl CheckError {
    pub(crate) fn unmet(
        expectation: impl Into<String>,
        command: Option<CommandLine>,
        output: impl Into<String>,
        head_lines: usize,
    ) -> Self {
        CheckError::ExpectationUnmet(Box::new(ExpectationUnmet {
            expectation: expectation.into(),
            command,
            output: output.into(),
            head_lines,
        }))
    }

    pub(crate) fn regex(pattern: &str, source: regex::Error) -> Self {
        CheckError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        }
    }
}

/// An unmet expectation with everything needed to reproduce it
#[derive(Debug, Clone)]
pub struct ExpectationUnmet {
    /// What was expected and what happened instead
    pub expectation: String,
    /// The invocation whose outcome was checked
    pub command: Option<CommandLine>,
    /// Full diagnostic or program output
    pub output: String,
    /// How many output lines to show
    pub head_lines: usize,
}

impl ExpectationUnmet {
    /// The first `head_lines` lines of the output
    pub fn output_head(&self) -> String {
        self.output
            .lines()
            .take(self.head_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ExpectationUnmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.expectation)?;
        if let Some(command) = &self.command {
            writeln!(f)?;
            writeln!(f, "Ran command: {}", command.reproduce())?;
        }
        if !self.output.is_empty() {
            writeln!(f)?;
            writeln!(f, "Output (first {} lines):", self.head_lines)?;
            write!(f, "{}", self.output_head())?;
        }
        Ok(())
    }
}

/// A parametrized case that failed
#[derive(Debug)]
pub struct CaseFailure {
    /// The case's parameters
    pub params: ParameterMapping,
    /// Why it failed
    pub error: CheckError,
}

fn render_case_failures(failures: &[CaseFailure]) -> String {
    let mut out = format!("{} parametrized case(s) failed", failures.len());
    for failure in failures {
        out.push_str(&format!("\n\n=== case {} ===\n{}", failure.params, failure.error));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmet_renders_head_only() {
        let output: Vec<String> = (1..=50).map(|i| format!("line {}", i)).collect();
        let err = CheckError::unmet(
            "expected an error",
            Some(CommandLine::new("g++").arg("-c")),
            output.join("\n"),
            3,
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("expected an error\n"));
        assert!(rendered.contains("env -i g++ -c"));
        assert!(rendered.contains("line 3"));
        assert!(!rendered.contains("line 4"));
    }

    #[test]
    fn test_parametrized_lists_every_case() {
        let err = CheckError::Parametrized(vec![
            CaseFailure {
                params: ParameterMapping::new().with("X", "int"),
                error: CheckError::Config("first".into()),
            },
            CaseFailure {
                params: ParameterMapping::new().with("X", "float"),
                error: CheckError::Config("second".into()),
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("2 parametrized case(s) failed"));
        assert!(rendered.contains("=== case {X: int} ==="));
        assert!(rendered.contains("second"));
    }
}
