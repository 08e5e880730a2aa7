//! Command Runner
//!
//! Spawns child processes with an explicit environment and working directory,
//! captures stdout/stderr to completion, and surfaces failures carrying enough
//! context to re-run the command by hand.
//!
//! Nothing is inherited from the parent process: the environment recorded in a
//! [`CommandLine`] is exactly the environment the child sees.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Explicit child-process environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    vars: BTreeMap<String, String>,
}

impl CommandEnv {
    /// An empty environment
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// The snapshot is recorded verbatim in every command built from it, so
    /// failures reproduce with `env -i`.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Builder-style variable override
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Set a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Append a directory to a `PATH`-like variable using the platform separator
    #[must_use]
    pub fn with_path_appended(mut self, name: &str, dir: &Path) -> Self {
        let separator = if cfg!(windows) { ";" } else { ":" };
        let dir = dir.display().to_string();
        let value = match self.vars.get(name) {
            Some(existing) if !existing.is_empty() => format!("{}{}{}", existing, separator, dir),
            _ => dir,
        };
        self.vars.insert(name.to_string(), value);
        self
    }

    /// Iterate variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A fully specified child invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments, not including the program
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Complete child environment
    pub env: CommandEnv,
}

impl CommandLine {
    /// Start a command running in the current directory with an empty environment
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: CommandEnv::empty(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Set the complete environment
    #[must_use]
    pub fn env(mut self, env: CommandEnv) -> Self {
        self.env = env;
        self
    }

    /// One-line shell description that re-runs this command
    ///
    /// Format: `cd <cwd>; env -i K=V ... <program> <args...>`
    pub fn reproduce(&self) -> String {
        let mut parts = vec![
            "cd".to_string(),
            shell_quote(&self.cwd.display().to_string()) + ";",
            "env".to_string(),
            "-i".to_string(),
        ];
        for (name, value) in self.env.iter() {
            parts.push(format!("{}={}", name, shell_quote(value)));
        }
        parts.push(shell_quote(&self.program.display().to_string()));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reproduce())
    }
}

/// Quote a string for POSIX shells when it contains anything unusual
fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ',' | '+' | '@' | '%')
        });
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r#"'"'"'"#))
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output (lossily UTF-8 decoded)
    pub stdout: String,
    /// Standard error (lossily UTF-8 decoded)
    pub stderr: String,
}

/// Output lines shown when a failure is rendered
pub const OUTPUT_HEAD_LINES: usize = 40;

/// The first `max_lines` lines of `text`, with a note counting the rest
pub fn output_head(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    let mut head = text.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    if total > max_lines {
        head.push_str(&format!("\n[{} more line(s) omitted]", total - max_lines));
    }
    head
}

/// A child that exited with a non-zero status.
///
/// Rendering shows the first [`OUTPUT_HEAD_LINES`] lines of each stream; the
/// fields keep everything.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    /// The command that was run
    pub command: CommandLine,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ran command: {}", self.command.reproduce())?;
        match self.exit_code {
            Some(code) => writeln!(f, "Exit code {}", code)?,
            None => writeln!(f, "Terminated by signal")?,
        }
        writeln!(f, "Stdout:")?;
        writeln!(f, "{}", output_head(&self.stdout, OUTPUT_HEAD_LINES))?;
        writeln!(f)?;
        writeln!(f, "Stderr:")?;
        write!(f, "{}", output_head(&self.stderr, OUTPUT_HEAD_LINES))
    }
}

/// Errors from running a child process
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        /// Command that was attempted
        command: Box<CommandLine>,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited non-zero
    #[error("{0}")]
    Failed(Box<CommandFailure>),
}

impl CommandError {
    /// The command that failed
    pub fn command(&self) -> &CommandLine {
        match self {
            CommandError::Spawn { command, .. } => command,
            CommandError::Failed(failure) => &failure.command,
        }
    }

    /// The failure record, if the child ran and exited non-zero
    pub fn failure(&self) -> Option<&CommandFailure> {
        match self {
            CommandError::Failed(failure) => Some(failure),
            CommandError::Spawn { .. } => None,
        }
    }
}

/// Run a command to completion and capture its output.
///
/// Outputs are read whole (never streamed), so the child has fully exited
/// when this returns.
pub fn run_command(command: &CommandLine) -> Result<CommandOutput, CommandError> {
    info!("Executing command: {}", command.reproduce());

    let mut child = Command::new(&command.program);
    child
        .args(&command.args)
        .current_dir(&command.cwd)
        .env_clear()
        .envs(command.env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = child.output().map_err(|source| CommandError::Spawn {
        command: Box::new(command.clone()),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(CommandError::Failed(Box::new(CommandFailure {
            command: command.clone(),
            stdout,
            stderr,
            exit_code: output.status.code(),
        })));
    }

    debug!("Execution successful.\nstdout:\n{}\nstderr:\n{}", stdout, stderr);
    Ok(CommandOutput { stdout, stderr })
}
