//! Memoized toolchain and repository introspection
//!
//! Both lookups spawn external tools (`cmake`, `git`) and are cached for the
//! life of the process. Nothing is ever invalidated.

use crate::artifacts::ensure_empty_dir;
use crate::command::{run_command, CommandEnv, CommandError, CommandLine};
use fxhash::FxHashMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use thiserror::Error;

/// Errors from introspection probes
#[derive(Debug, Error)]
pub enum IntrospectionError {
    /// A probe command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Probe directory could not be prepared
    #[error("I/O error preparing probe in {path}: {source}")]
    Io {
        /// Directory being prepared
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The probe ran but printed nothing recognizable
    #[error("Could not parse compiler identity from CMake output:\n{output}")]
    UnrecognizedOutput {
        /// Probe output searched
        output: String,
    },
}

/// Commit and release information for a source checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Full SHA of `HEAD`
    pub commit_hash: String,
    /// Release tag (`v<digit>...`) pointing exactly at `HEAD`, if any
    pub version_tag: Option<String>,
}

static COMPILER_NAMES: OnceLock<Mutex<FxHashMap<String, String>>> = OnceLock::new();
static REPO_INFOS: OnceLock<Mutex<FxHashMap<PathBuf, RepoInfo>>> = OnceLock::new();

const IDENTITY_CMAKELISTS: &str =
    "message(\"@@@${CMAKE_CXX_COMPILER_ID} ${CMAKE_CXX_COMPILER_VERSION}@@@\")\n";

/// Human-readable compiler identity such as `GCC 12.2.0` or `Clang 16.0.6`.
///
/// Runs a one-line CMake project in `probe_root/cxxprobe-compiler-identity`
/// with `CXX` set to `compiler`. Results are cached per compiler string.
pub fn compiler_identity(compiler: &str, probe_root: &Path) -> Result<String, IntrospectionError> {
    let cache = COMPILER_NAMES.get_or_init(Default::default);
    if let Some(name) = cache.lock().unwrap_or_else(|e| e.into_inner()).get(compiler) {
        return Ok(name.clone());
    }

    let dir = probe_root.join("cxxprobe-compiler-identity");
    let io_err = |source| IntrospectionError::Io {
        path: dir.clone(),
        source,
    };
    ensure_empty_dir(&dir).map_err(io_err)?;
    std::fs::write(dir.join("CMakeLists.txt"), IDENTITY_CMAKELISTS).map_err(io_err)?;

    let command = CommandLine::new("cmake")
        .arg(".")
        .cwd(&dir)
        .env(CommandEnv::capture().with("CXX", compiler));
    let output = run_command(&command)?;

    let name = parse_identity(&output.stderr).ok_or(IntrospectionError::UnrecognizedOutput {
        output: output.stderr,
    })?;
    cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(compiler.to_string(), name.clone());
    Ok(name)
}

/// Extract the `@@@...@@@` marker printed by the CMake probe
fn parse_identity(output: &str) -> Option<String> {
    let marker = Regex::new("@@@(.*)@@@").ok()?;
    marker
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replacen("GNU ", "GCC ", 1))
}

/// Commit hash and exact release tag of the git checkout at `path`.
///
/// Missing tags are not an error. Results are cached per path.
pub fn repo_info(path: &Path) -> Result<RepoInfo, IntrospectionError> {
    let cache = REPO_INFOS.get_or_init(Default::default);
    if let Some(info) = cache.lock().unwrap_or_else(|e| e.into_inner()).get(path) {
        return Ok(info.clone());
    }

    let env = CommandEnv::capture();
    let head = CommandLine::new("git")
        .args(["rev-parse", "HEAD"])
        .cwd(path)
        .env(env.clone());
    let commit_hash = run_command(&head)?.stdout.trim().to_string();

    let describe = CommandLine::new("git")
        .args(["describe", "--tags", "--exact-match", "--match", "v[0-9]*", "HEAD"])
        .cwd(path)
        .env(env);
    let version_tag = run_command(&describe)
        .ok()
        .map(|out| out.stdout.trim().to_string())
        .filter(|tag| !tag.is_empty());

    let info = RepoInfo {
        commit_hash,
        version_tag,
    };
    cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(path.to_path_buf(), info.clone());
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity_renames_gnu() {
        let stderr = "-- The CXX compiler identification is GNU 12.2.0\n@@@GNU 12.2.0@@@\n-- Configuring done\n";
        assert_eq!(parse_identity(stderr).as_deref(), Some("GCC 12.2.0"));
    }

    #[test]
    fn test_parse_identity_keeps_clang() {
        assert_eq!(
            parse_identity("@@@Clang 16.0.6@@@").as_deref(),
            Some("Clang 16.0.6")
        );
    }

    #[test]
    fn test_parse_identity_missing_marker() {
        assert_eq!(parse_identity("-- Configuring done"), None);
    }

    #[test]
    fn test_repo_info_outside_repo_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(repo_info(dir.path()).is_err());
    }
}
