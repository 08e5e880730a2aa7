//! Result metadata attached to every benchmark description

use super::benchmarks::BenchmarkEnvironment;
use anyhow::Context;
use cxxprobe_core::{DimensionValue, ParameterMapping, compiler_identity, repo_info};
use std::path::Path;

/// Extend `benchmark` with the compiler identity and the commit of the code
/// under test.
///
/// `di_library_version` is only present when the checkout sits exactly on a
/// release tag. Identity probes run under `probe_root`.
pub fn describe(
    benchmark: &ParameterMapping,
    env: &BenchmarkEnvironment,
    probe_root: &Path,
) -> anyhow::Result<ParameterMapping> {
    let mut extra: Vec<(String, DimensionValue)> = Vec::new();

    if let Some(compiler) = benchmark.get_str("compiler") {
        let name = compiler_identity(compiler, probe_root)
            .with_context(|| format!("Could not identify compiler {}", compiler))?;
        extra.push(("compiler_name".to_string(), name.into()));
    }

    if let Some(checkout) = env.code_under_test(benchmark) {
        let info = repo_info(checkout)
            .with_context(|| format!("Could not read git metadata of {}", checkout.display()))?;
        extra.push(("di_library_git_commit_hash".to_string(), info.commit_hash.into()));
        if let Some(tag) = info.version_tag {
            extra.push(("di_library_version".to_string(), tag.into()));
        }
    }

    Ok(benchmark.augmented(extra))
}
