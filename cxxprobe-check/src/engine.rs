//! Assertion Engine
//!
//! The four verbs a compile-time test suite is written with:
//! [`Harness::expect_success`], [`Harness::expect_generic_compile_error`],
//! [`Harness::expect_compile_error`] and [`Harness::expect_runtime_error`].
//!
//! Each verb materializes the test source, drives the compiler, classifies
//! the outcome and removes its temp files only when the expectation held and
//! coverage mode is off.

use crate::config::HarnessConfig;
use crate::diagnostics::{
    DiagnosticPatterns, compile_regex, find_first, normalize_line, normalize_lines,
    splice_context,
};
use crate::error::CheckError;
use crate::source::{SourceFragment, substitute_params};
use cxxprobe_core::{
    CommandEnv, CommandError, CommandLine, CompileError, Compiler, ParameterMapping,
    reserve_executable_path, run_command, try_remove,
};
use regex::RegexBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-call switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectOptions {
    /// Silence deprecation warnings
    pub ignore_deprecation: bool,
    /// Do not treat warnings as errors
    pub ignore_warnings: bool,
    /// Skip the first-lines proximity check
    pub disable_line_check: bool,
}

impl ExpectOptions {
    /// Silence deprecation warnings
    #[must_use]
    pub fn ignore_deprecation(mut self) -> Self {
        self.ignore_deprecation = true;
        self
    }

    /// Do not treat warnings as errors
    #[must_use]
    pub fn ignore_warnings(mut self) -> Self {
        self.ignore_warnings = true;
        self
    }

    /// Skip the first-lines proximity check
    #[must_use]
    pub fn disable_line_check(mut self) -> Self {
        self.disable_line_check = true;
        self
    }
}

/// A configured assertion engine
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    compiler: Compiler,
    patterns: DiagnosticPatterns,
    runtime_env: CommandEnv,
}

impl Harness {
    /// Build a harness from a validated configuration
    pub fn new(config: HarnessConfig) -> Result<Self, CheckError> {
        config.validate()?;
        let patterns = DiagnosticPatterns::from_config(&config)?;
        Ok(Self {
            compiler: config.compiler(),
            runtime_env: config.runtime_env(),
            patterns,
            config,
        })
    }

    /// Build a harness from `CXXPROBE_CONFIG`, a discovered `cxxprobe.toml`,
    /// or defaults
    pub fn from_env() -> Result<Self, CheckError> {
        Self::new(HarnessConfig::from_env()?)
    }

    /// Replace the compiler driver
    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Compiler driver in use
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    fn head_lines(&self) -> usize {
        self.config.diagnostics.head_lines
    }

    fn is_msvc(&self) -> bool {
        self.compiler.family.is_msvc()
    }

    fn keep_artifacts(&self) -> bool {
        self.config.coverage.enabled
    }

    fn cleanup(&self, paths: &[&Path]) {
        if self.keep_artifacts() {
            return;
        }
        for path in paths {
            try_remove(path);
        }
    }

    fn flag_args(&self, options: &ExpectOptions) -> Vec<String> {
        let family = self.compiler.family;
        let mut args = Vec::new();
        if options.ignore_deprecation {
            args.push(family.suppress_deprecation_flag().to_string());
        }
        if options.ignore_warnings {
            args.push(family.suppress_warnings_flag().to_string());
        }
        args
    }

    fn coverage_args(&self) -> Vec<String> {
        if self.config.coverage.enabled && !self.is_msvc() {
            vec!["-fno-profile-arcs".to_string(), "-fno-test-coverage".to_string()]
        } else {
            Vec::new()
        }
    }

    fn include_dirs(&self) -> &[PathBuf] {
        &self.config.compiler.include_dirs
    }

    fn link(
        &self,
        source: &Path,
        options: &ExpectOptions,
    ) -> Result<(PathBuf, CommandLine), CheckError> {
        let executable = reserve_executable_path().map_err(|e| CheckError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
        let command = self.compiler.compile_and_link(
            source,
            self.include_dirs(),
            &executable,
            &self.config.compiler.linker_flags,
            &self.flag_args(options),
        )?;
        Ok((executable, command))
    }

    fn executable_command(&self, executable: &Path) -> CommandLine {
        let runtime = &self.config.runtime;
        let command = if runtime.memory_checker {
            CommandLine::new(&runtime.memory_checker_executable)
                .args(runtime.memory_checker_flags.iter().cloned())
                .arg(executable.display().to_string())
        } else {
            CommandLine::new(executable)
        };
        command.env(self.runtime_env.clone())
    }

    /// Compile discarding output, expecting the compiler to fail. Returns
    /// the diagnostic stream and the command that produced it.
    fn compile_expecting_failure(
        &self,
        source: &Path,
        args: &[String],
    ) -> Result<(String, CommandLine), CheckError> {
        match self.compiler.compile_discard(source, self.include_dirs(), args) {
            Ok(command) => Err(CheckError::unmet(
                "The test should have failed to compile, but it compiled successfully",
                Some(command),
                String::new(),
                self.head_lines(),
            )),
            Err(CompileError::Failed(failure)) => {
                let failure = *failure;
                Ok((failure.message, failure.command))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Compile, link and run; the program must exit zero.
    ///
    /// A body without `main(` gets an empty `main`.
    pub fn expect_success(
        &self,
        source: &SourceFragment,
        options: &ExpectOptions,
    ) -> Result<(), CheckError> {
        let mut source = source.clone();
        if !source.body.contains("main(") {
            source.body.push_str("\nint main() {\n}\n");
        }
        let source_path = source.materialize()?;
        let (executable, _) = self.link(&source_path, options)?;

        run_command(&self.executable_command(&executable))?;

        self.cleanup(&[source_path.as_path(), executable.as_path()]);
        Ok(())
    }

    /// Compile expecting failure; some canonicalized diagnostic line must
    /// match `expected_error_regex`.
    pub fn expect_generic_compile_error(
        &self,
        expected_error_regex: &str,
        source: &SourceFragment,
    ) -> Result<(), CheckError> {
        let expected = self.expected_pattern(expected_error_regex, &source.params)?;
        let expected_re = compile_regex(&expected)?;

        let source_path = source.materialize()?;
        let (output, command) = self.compile_expecting_failure(&source_path, &self.coverage_args())?;

        let raw_lines: Vec<&str> = output.lines().collect();
        for (i, line) in raw_lines.iter().enumerate() {
            let spliced = if self.is_msvc() {
                splice_context(line, &raw_lines[i + 1..])?
            } else {
                line.to_string()
            };
            if expected_re.is_match(&normalize_line(&spliced)) {
                debug!("Expected error found on line {}", i + 1);
                self.cleanup(&[source_path.as_path()]);
                return Ok(());
            }
        }

        Err(CheckError::unmet(
            format!(
                "The compilation failed as expected, but the expected error was not found.\nExpected error: {}",
                expected
            ),
            Some(command),
            output,
            self.head_lines(),
        ))
    }

    /// Compile expecting failure with a library error type and static
    /// assertion message near the top of the diagnostics.
    ///
    /// The error type is captured from the first canonicalized line matching
    /// the configured error-type pattern (with MSVC context spliced in) and
    /// must match `expected_error_type_regex`. The message of the first raw
    /// line matching the static-assert pattern must match
    /// `expected_error_desc_regex`. Unless disabled, both lines must be within
    /// the first `max_error_line + 1` lines, and no earlier line may mention
    /// the internal namespace.
    pub fn expect_compile_error(
        &self,
        expected_error_type_regex: &str,
        expected_error_desc_regex: &str,
        source: &SourceFragment,
        options: &ExpectOptions,
    ) -> Result<(), CheckError> {
        if expected_error_type_regex.contains('\n') || expected_error_desc_regex.contains('\n') {
            return Err(CheckError::InvalidExpectation(
                "error regexes are matched against single lines and must not contain newlines"
                    .to_string(),
            ));
        }
        let expected_type = self.expected_pattern(expected_error_type_regex, &source.params)?;
        let type_re = compile_regex(&expected_type)?;
        let desc_re = compile_regex(expected_error_desc_regex)?;

        let source_path = source.materialize()?;
        let mut args = self.flag_args(options);
        args.extend(self.coverage_args());
        let (output, command) = self.compile_expecting_failure(&source_path, &args)?;

        let head = self.head_lines();
        let unmet = |message: String| {
            CheckError::unmet(message, Some(command.clone()), output.clone(), head)
        };

        let raw_lines: Vec<&str> = output.lines().collect();
        let normalized = normalize_lines(&output);

        let error_type = find_first(&normalized[..], &self.patterns.error_type).ok_or_else(|| {
            unmet(format!(
                "The compilation failed as expected, but without the expected error type.\nExpected error type: {}",
                expected_type
            ))
        })?;
        let actual_type = if self.is_msvc() {
            splice_context(&error_type.capture, &normalized[error_type.line + 1..])?
        } else {
            error_type.capture.clone()
        };

        let static_assert = find_first(&raw_lines[..], &self.patterns.static_assert).ok_or_else(|| {
            unmet(format!(
                "The compilation failed as expected, but without a static assertion.\nExpected static assert error: {}",
                expected_error_desc_regex
            ))
        })?;

        if !type_re.is_match(&actual_type) {
            return Err(unmet(format!(
                "The compilation failed as expected, but with a different error type.\nExpected error type:    {}\nError type was:         {}",
                expected_type, actual_type
            )));
        }
        if !desc_re.is_match(&static_assert.capture) {
            return Err(unmet(format!(
                "The compilation failed as expected, but with a different error message.\nExpected error message: {}\nError message was:      {}",
                expected_error_desc_regex, static_assert.capture
            )));
        }

        let max_line = self.patterns.max_error_line;
        if !options.disable_line_check {
            if error_type.line > max_line {
                return Err(unmet(format!(
                    "The compilation failed with the expected error type, but on line {} instead of within the first {} lines",
                    error_type.line + 1,
                    max_line + 1
                )));
            }
            if static_assert.line > max_line {
                return Err(unmet(format!(
                    "The compilation failed with the expected static assertion, but on line {} instead of within the first {} lines",
                    static_assert.line + 1,
                    max_line + 1
                )));
            }
        }

        let end = error_type.line.max(static_assert.line);
        if let Some(leak) = self.patterns.internal_leak(&raw_lines[..], end) {
            return Err(unmet(format!(
                "The compilation failed with the expected error, but line {} mentions an internal namespace before it:\n{}",
                leak + 1,
                raw_lines[leak]
            )));
        }

        info!("Compilation failed as expected: {}", actual_type);
        self.cleanup(&[source_path.as_path()]);
        Ok(())
    }

    /// Compile, link and run expecting the program to fail with stderr
    /// matching `expected_error_regex`. A regex containing a newline is
    /// matched in multi-line mode.
    pub fn expect_runtime_error(
        &self,
        expected_error_regex: &str,
        source: &SourceFragment,
        options: &ExpectOptions,
    ) -> Result<(), CheckError> {
        let expected_re = RegexBuilder::new(expected_error_regex)
            .multi_line(expected_error_regex.contains('\n'))
            .build()
            .map_err(|e| CheckError::regex(expected_error_regex, e))?;

        let source_path = source.materialize()?;
        let (executable, _) = self.link(&source_path, options)?;
        let command = self.executable_command(&executable);

        match run_command(&command) {
            Ok(output) => Err(CheckError::unmet(
                "The test should have failed at runtime, but it ran successfully",
                Some(command),
                output.stdout,
                self.head_lines(),
            )),
            Err(CommandError::Failed(failure)) => {
                if expected_re.is_match(&failure.stderr) {
                    self.cleanup(&[source_path.as_path(), executable.as_path()]);
                    Ok(())
                } else {
                    Err(CheckError::unmet(
                        format!(
                            "The test failed at runtime as expected, but stderr did not match.\nExpected error: {}",
                            expected_error_regex
                        ),
                        Some(failure.command.clone()),
                        failure.stderr.clone(),
                        self.head_lines(),
                    ))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Substitute test parameters into an expected pattern and drop spaces,
    /// matching the canonical diagnostic form
    fn expected_pattern(&self, pattern: &str, params: &ParameterMapping) -> Result<String, CheckError> {
        Ok(substitute_params(pattern, params)?.replace(' ', ""))
    }
}
