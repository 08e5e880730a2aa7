//! Benchmark definition files
//!
//! ```yaml
//! global:
//!   max_runs: 20
//!   max_hours_per_combination: 2
//! benchmarks:
//!   - name: [fruit_compile_time, boost_di_compile_time]
//!     compiler: [g++-12, clang++-16]
//!     cxx_std: c++17
//!     num_classes: [100, 1000]
//!     additional_cmake_args: [[]]
//! ```
//!
//! Any value may be a list; each block expands to the cross product of its
//! list-valued keys. A list nested inside a list is a single tuple value.

use anyhow::{Context, bail};
use cxxprobe_core::DimensionValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One block of the `benchmarks` list, before expansion
pub type DefinitionBlock = BTreeMap<String, DimensionValue>;

/// Contents of a benchmark definition file
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkDefinitionFile {
    /// Settings shared by every benchmark
    pub global: GlobalSettings,
    /// Blocks to expand
    #[serde(default)]
    pub benchmarks: Vec<DefinitionBlock>,
}

/// `global` section of a benchmark definition file
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalSettings {
    /// Upper bound on runs of one benchmark
    pub max_runs: usize,
    /// Wall-clock budget for the convergence loop of one benchmark
    pub max_hours_per_combination: f64,
    /// Runs always performed before checking convergence
    #[serde(default = "default_min_runs")]
    pub min_runs: usize,
}

fn default_min_runs() -> usize {
    3
}

impl GlobalSettings {
    /// Convergence timeout per benchmark
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.max_hours_per_combination * 3600.0)
    }
}

impl BenchmarkDefinitionFile {
    /// Parse and validate a definition from YAML text
    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        let definition: Self = serde_yaml::from_str(yaml)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Load and validate a definition file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read benchmark definition {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid benchmark definition {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let global = &self.global;
        if global.max_runs == 0 {
            bail!("global.max_runs must be at least 1");
        }
        if global.min_runs == 0 {
            bail!("global.min_runs must be at least 1");
        }
        if !global.max_hours_per_combination.is_finite() || global.max_hours_per_combination < 0.0 {
            bail!(
                "global.max_hours_per_combination must be a non-negative number, got {}",
                global.max_hours_per_combination
            );
        }
        Ok(())
    }
}
