//! Benchmark Planner
//!
//! Expands definition blocks into concrete parameter mappings and groups them
//! by toolchain.
//!
//! - Expansion takes keys in sorted order; the last key varies fastest.
//! - A name filter keeps only mappings whose `name` matches.
//! - Groups are keyed by `(compiler, additional_cmake_args)` and appear in the
//!   order their first mapping was produced, so the library under test is
//!   built once per group.

use crate::config::DefinitionBlock;
use anyhow::bail;
use cxxprobe_core::{DimensionValue, ParameterMapping};
use fxhash::FxHashMap;
use regex::Regex;

/// Expand one block into the cross product of its list-valued keys.
///
/// A key whose list is empty contributes no values, so the block expands to
/// nothing.
pub fn expand_block(block: &DefinitionBlock) -> Vec<ParameterMapping> {
    let mut expanded = vec![ParameterMapping::new()];
    for (name, value) in block {
        let choices: Vec<&DimensionValue> = match value {
            DimensionValue::Tuple(items) => items.iter().collect(),
            scalar => vec![scalar],
        };
        expanded = expanded
            .iter()
            .flat_map(|partial| {
                choices
                    .iter()
                    .map(move |choice| partial.clone().with(name.clone(), (*choice).clone()))
            })
            .collect();
    }
    expanded
}

/// Expand every block, concatenating results in block order
pub fn expand_blocks(blocks: &[DefinitionBlock]) -> Vec<ParameterMapping> {
    blocks.iter().flat_map(expand_block).collect()
}

/// Toolchain identity shared by a group of benchmarks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolchainKey {
    /// Compiler executable
    pub compiler: String,
    /// Extra CMake arguments for the library build
    pub cmake_args: Vec<String>,
}

impl ToolchainKey {
    /// Toolchain of one benchmark; `compiler` is required
    pub fn of(benchmark: &ParameterMapping) -> anyhow::Result<Self> {
        let Some(compiler) = benchmark.get_str("compiler") else {
            bail!("Benchmark {} has no string 'compiler' dimension", benchmark);
        };
        let cmake_args = benchmark
            .get("additional_cmake_args")
            .map(DimensionValue::to_string_list)
            .unwrap_or_default();
        Ok(Self {
            compiler: compiler.to_string(),
            cmake_args,
        })
    }
}

/// Benchmarks sharing one library build
#[derive(Debug, Clone)]
pub struct ToolchainGroup {
    /// Shared toolchain
    pub key: ToolchainKey,
    /// Benchmarks in expansion order
    pub benchmarks: Vec<ParameterMapping>,
}

impl ToolchainGroup {
    /// Whether any benchmark in the group links against Fruit
    pub fn needs_fruit_build(&self) -> bool {
        self.benchmarks
            .iter()
            .any(|b| b.get_str("name").is_some_and(|name| name.starts_with("fruit_")))
    }
}

/// Execution plan for a benchmark run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Groups in first-appearance order
    pub groups: Vec<ToolchainGroup>,
}

impl ExecutionPlan {
    /// Number of benchmarks across all groups
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.benchmarks.len()).sum()
    }
}

/// Expand, filter by name and group the definition blocks
pub fn build_plan(blocks: &[DefinitionBlock], filter: Option<&Regex>) -> anyhow::Result<ExecutionPlan> {
    let mut groups: Vec<ToolchainGroup> = Vec::new();
    let mut index: FxHashMap<ToolchainKey, usize> = FxHashMap::default();

    for benchmark in expand_blocks(blocks) {
        if let Some(re) = filter {
            if !benchmark.get_str("name").is_some_and(|name| re.is_match(name)) {
                continue;
            }
        }

        let key = ToolchainKey::of(&benchmark)?;
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(ToolchainGroup {
                key,
                benchmarks: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].benchmarks.push(benchmark);
    }

    Ok(ExecutionPlan { groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(entries: &[(&str, DimensionValue)]) -> DefinitionBlock {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn list(items: &[&str]) -> DimensionValue {
        DimensionValue::Tuple(items.iter().map(|s| DimensionValue::from(*s)).collect())
    }

    #[test]
    fn test_expand_sorted_cross_product() {
        let blocks = vec![block(&[
            ("a", DimensionValue::Tuple(vec![1.into(), 2.into()])),
            ("b", "X".into()),
        ])];
        let expanded = expand_blocks(&blocks);
        assert_eq!(
            expanded,
            vec![
                ParameterMapping::new().with("a", 1).with("b", "X"),
                ParameterMapping::new().with("a", 2).with("b", "X"),
            ]
        );
    }

    #[test]
    fn test_expand_multiple_blocks() {
        let blocks = vec![
            block(&[("name", "foo".into()), ("compiler", list(&["g++-5", "g++-6"]))]),
            block(&[
                ("name", list(&["bar", "baz"])),
                ("compiler", list(&["g++-5"])),
                ("cxx_std", "c++14".into()),
            ]),
        ];
        let expanded = expand_blocks(&blocks);
        assert_eq!(
            expanded,
            vec![
                ParameterMapping::new().with("name", "foo").with("compiler", "g++-5"),
                ParameterMapping::new().with("name", "foo").with("compiler", "g++-6"),
                ParameterMapping::new()
                    .with("name", "bar")
                    .with("compiler", "g++-5")
                    .with("cxx_std", "c++14"),
                ParameterMapping::new()
                    .with("name", "baz")
                    .with("compiler", "g++-5")
                    .with("cxx_std", "c++14"),
            ]
        );
        assert!(expanded
            .iter()
            .all(|m| m.iter().all(|(_, v)| !v.is_tuple())));
    }

    #[test]
    fn test_nested_list_is_one_value() {
        let blocks = vec![block(&[(
            "additional_cmake_args",
            DimensionValue::Tuple(vec![list(&[]), list(&["-DFRUIT_USES_BOOST=False"])]),
        )])];
        let expanded = expand_blocks(&blocks);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].get("additional_cmake_args"), Some(&list(&[])));
    }

    #[test]
    fn test_empty_list_expands_to_nothing() {
        let blocks = vec![block(&[("name", "foo".into()), ("compiler", list(&[]))])];
        assert!(expand_blocks(&blocks).is_empty());
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let blocks = vec![block(&[
            ("name", list(&["fruit_compile_time", "simple_di_compile_time"])),
            ("compiler", list(&["g++-12", "clang++-16"])),
            ("additional_cmake_args", DimensionValue::Tuple(vec![list(&[])])),
        ])];
        let plan = build_plan(&blocks, None).unwrap();
        assert_eq!(plan.total(), 4);
        assert_eq!(plan.groups.len(), 2);
        // "compiler" sorts before "name", so compilers vary slowest
        assert_eq!(plan.groups[0].key.compiler, "g++-12");
        assert_eq!(plan.groups[1].key.compiler, "clang++-16");
        assert!(plan.groups[0].key.cmake_args.is_empty());
        assert!(plan.groups[0].needs_fruit_build());
    }

    #[test]
    fn test_name_filter() {
        let blocks = vec![block(&[
            ("name", list(&["fruit_compile_time", "simple_di_compile_time"])),
            ("compiler", "g++-12".into()),
        ])];
        let re = Regex::new("^simple_di").unwrap();
        let plan = build_plan(&blocks, Some(&re)).unwrap();
        assert_eq!(plan.total(), 1);
        assert!(!plan.groups[0].needs_fruit_build());
    }

    #[test]
    fn test_missing_compiler_is_an_error() {
        let blocks = vec![block(&[("name", "fruit_compile_time".into())])];
        assert!(build_plan(&blocks, None).is_err());
    }
}
