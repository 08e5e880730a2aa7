//! Configuration loading from cxxprobe.toml
//!
//! The assertion engine is configured from a `cxxprobe.toml` file. The path
//! can be given in `CXXPROBE_CONFIG`; otherwise the file is discovered by
//! walking up from the current directory. Every section is optional.

use crate::error::CheckError;
use cxxprobe_core::{CommandEnv, Compiler, CompilerFamily};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CXXPROBE_CONFIG";

/// Config file name searched for when walking up
pub const CONFIG_FILE_NAME: &str = "cxxprobe.toml";

/// Assertion engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Compiler selection and flags
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Diagnostic extraction patterns
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Environment for compiled test executables
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Sanitizer instrumentation
    #[serde(default)]
    pub sanitizers: SanitizersConfig,
    /// Coverage mode
    #[serde(default)]
    pub coverage: CoverageConfig,
}

/// Compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Compiler executable
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Command-line dialect: "posix" or "msvc"
    #[serde(default)]
    pub family: CompilerFamily,
    /// Standard flags prepended to every compile
    #[serde(default)]
    pub flags: Vec<String>,
    /// Include directories for every compile
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /// Flags added when linking test executables
    #[serde(default)]
    pub linker_flags: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            family: CompilerFamily::default(),
            flags: Vec::new(),
            include_dirs: Vec::new(),
            linker_flags: Vec::new(),
        }
    }
}

fn default_executable() -> String {
    "c++".to_string()
}

/// Diagnostic extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Pattern locating the library's error type; group 1 is the type
    #[serde(default = "default_error_type_pattern")]
    pub error_type_pattern: String,
    /// Pattern locating the static assertion message; group 1 is the message.
    /// Defaults per compiler family.
    #[serde(default)]
    pub static_assert_pattern: Option<String>,
    /// Namespace that must not appear before the expected error
    #[serde(default = "default_internal_namespace_pattern")]
    pub internal_namespace_pattern: String,
    /// Last 0-based diagnostic line allowed to carry the expected error
    #[serde(default = "default_max_error_line")]
    pub max_error_line: usize,
    /// Output lines included in failure reports
    #[serde(default = "default_head_lines")]
    pub head_lines: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            error_type_pattern: default_error_type_pattern(),
            static_assert_pattern: None,
            internal_namespace_pattern: default_internal_namespace_pattern(),
            max_error_line: default_max_error_line(),
            head_lines: default_head_lines(),
        }
    }
}

fn default_error_type_pattern() -> String {
    "fruit::impl::(.*Error<.*>)".to_string()
}
fn default_internal_namespace_pattern() -> String {
    "fruit::impl::meta".to_string()
}
fn default_max_error_line() -> usize {
    6
}
fn default_head_lines() -> usize {
    40
}

/// Runtime configuration for compiled test executables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory appended to `PATH` when running test executables
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
    /// Run test executables under a memory checker
    #[serde(default)]
    pub memory_checker: bool,
    /// Memory checker executable
    #[serde(default = "default_memory_checker_executable")]
    pub memory_checker_executable: String,
    /// Memory checker flags
    #[serde(default)]
    pub memory_checker_flags: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            memory_checker: false,
            memory_checker_executable: default_memory_checker_executable(),
            memory_checker_flags: Vec::new(),
        }
    }
}

fn default_memory_checker_executable() -> String {
    "valgrind".to_string()
}

/// Sanitizer configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SanitizersConfig {
    /// AddressSanitizer
    #[serde(default)]
    pub address: bool,
    /// UndefinedBehaviorSanitizer (requires `address`)
    #[serde(default)]
    pub undefined: bool,
}

/// Coverage configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CoverageConfig {
    /// Keep temp files and disable profiling in expected-failure compiles
    #[serde(default)]
    pub enabled: bool,
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, CheckError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CheckError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Try to discover a config file by walking up from the current directory
    pub fn discover() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Load from `CXXPROBE_CONFIG`, else a discovered file, else defaults
    pub fn from_env() -> Result<Self, CheckError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(PathBuf::from(path));
        }
        match Self::discover() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject incompatible settings
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.sanitizers.undefined && !self.sanitizers.address {
            return Err(CheckError::Config(
                "sanitizers.undefined requires sanitizers.address".to_string(),
            ));
        }
        if self.sanitizers.address && self.compiler.family.is_msvc() {
            return Err(CheckError::Config(
                "sanitizers are only supported with posix compilers".to_string(),
            ));
        }
        Ok(())
    }

    /// Static assertion pattern, falling back to the family default
    pub fn static_assert_pattern(&self) -> &str {
        match &self.diagnostics.static_assert_pattern {
            Some(pattern) => pattern,
            None if self.compiler.family.is_msvc() => "error C2338: (.*)",
            None => "static.assert(.*)",
        }
    }

    /// Standard flags plus sanitizer instrumentation
    pub fn std_flags(&self) -> Vec<String> {
        let mut flags = self.compiler.flags.clone();
        if self.sanitizers.address {
            flags.push("-fsanitize=address".to_string());
        }
        if self.sanitizers.undefined {
            flags.push("-fsanitize=undefined".to_string());
        }
        flags
    }

    /// Compiler driver for this configuration
    pub fn compiler(&self) -> Compiler {
        Compiler::new(&self.compiler.executable, self.compiler.family).with_std_flags(self.std_flags())
    }

    /// Environment for compiled test executables
    pub fn runtime_env(&self) -> CommandEnv {
        let env = CommandEnv::capture();
        match &self.runtime.library_dir {
            Some(dir) => env.with_path_appended("PATH", dir),
            None => env,
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# cxxprobe assertion engine configuration

[compiler]
# Compiler executable
executable = "c++"
# Command-line dialect: "posix" (GCC, Clang) or "msvc"
family = "posix"
# Standard flags prepended to every compile
flags = ["-std=c++11", "-W", "-Wall"]
# Include directories for every compile
include_dirs = []
# Flags added when linking test executables
linker_flags = []

[diagnostics]
# Pattern locating the library's error type (group 1 is the type)
error_type_pattern = "fruit::impl::(.*Error<.*>)"
# Pattern locating the static assertion message (defaults per family)
# static_assert_pattern = "static.assert(.*)"
# Namespace that must not appear before the expected error
internal_namespace_pattern = "fruit::impl::meta"
# Last 0-based diagnostic line allowed to carry the expected error
max_error_line = 6
# Output lines included in failure reports
head_lines = 40

[runtime]
# Directory appended to PATH when running test executables (uncomment to enable)
# library_dir = "build/lib"
# Run test executables under a memory checker
memory_checker = false
memory_checker_executable = "valgrind"
memory_checker_flags = ["--leak-check=full", "--error-exitcode=1"]

[sanitizers]
address = false
# Requires address
undefined = false

[coverage]
# Keep temp files and disable profiling in expected-failure compiles
enabled = false
"#
        .to_string()
    }
}
