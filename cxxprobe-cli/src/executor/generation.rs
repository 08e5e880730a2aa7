//! Benchmark Source Generation
//!
//! Generated projects model an application of `num_classes` components wired
//! by a dependency-injection library. The dependency graph is a seeded random
//! DAG, so the same parameters always produce the same sources.
//!
//! ## Layout
//!
//! - `component<i>.h` / `component<i>.cpp` for every component
//! - one extra top-level component depending on every component nothing
//!   else depends on
//! - `main.cpp`, which builds the top-level component
//! - a `Makefile` linking everything into `main`

use super::makefile::emit_makefile;
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Most dependencies a generated component can have
const MAX_DEPS: usize = 10;

/// Seed for every generated graph
pub const GRAPH_SEED: u64 = 42;

/// Dependency-injection library used by a generated project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiLibrary {
    /// Google Fruit
    Fruit,
    /// Boost.DI
    BoostDi,
    /// Hand-written wiring, no library
    SimpleDi,
}

impl DiLibrary {
    /// Libraries in benchmark-name prefix order
    pub const ALL: [DiLibrary; 3] = [DiLibrary::Fruit, DiLibrary::BoostDi, DiLibrary::SimpleDi];

    /// Benchmark-name prefix, e.g. `boost_di`
    pub fn prefix(self) -> &'static str {
        match self {
            DiLibrary::Fruit => "fruit",
            DiLibrary::BoostDi => "boost_di",
            DiLibrary::SimpleDi => "simple_di",
        }
    }

    /// Split `<library>_<kind>` into its parts
    pub fn split_benchmark_name(name: &str) -> Option<(DiLibrary, &str)> {
        Self::ALL.into_iter().find_map(|library| {
            name.strip_prefix(library.prefix())
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|kind| (library, kind))
        })
    }

    fn generator(self) -> &'static dyn SourceGenerator {
        match self {
            DiLibrary::Fruit => &FruitGenerator,
            DiLibrary::BoostDi => &BoostDiGenerator,
            DiLibrary::SimpleDi => &SimpleDiGenerator,
        }
    }
}

/// Component dependency graph; the last component is the top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    deps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Random DAG of `num_classes` components plus a top-level component.
    ///
    /// The first `num_classes / 10` components (at least one) have no
    /// dependencies; each later component depends on up to [`MAX_DEPS`]
    /// earlier ones.
    pub fn generate(num_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let no_deps = (num_classes / 10).max(1).min(num_classes);

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(num_classes + 1);
        for i in 0..num_classes {
            if i < no_deps {
                deps.push(Vec::new());
            } else {
                let mut chosen = rand::seq::index::sample(&mut rng, i, MAX_DEPS.min(i)).into_vec();
                chosen.sort_unstable();
                deps.push(chosen);
            }
        }

        let mut has_dependent = vec![false; num_classes];
        for &dep in deps.iter().flatten() {
            has_dependent[dep] = true;
        }
        deps.push((0..num_classes).filter(|&i| !has_dependent[i]).collect());
        Self { deps }
    }

    /// Number of components, including the top level
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    /// Whether the graph has no components (never true)
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Index of the top-level component
    pub fn toplevel(&self) -> usize {
        self.deps.len() - 1
    }

    /// Dependencies of component `i`
    pub fn deps(&self, i: usize) -> &[usize] {
        &self.deps[i]
    }
}

/// Per-library C++ templates
trait SourceGenerator: Sync {
    fn component_header(&self, i: usize, deps: &[usize]) -> String;
    fn component_source(&self, i: usize, deps: &[usize]) -> String;
    /// Components `main.cpp` must include
    fn main_includes(&self, graph: &DependencyGraph) -> Vec<usize>;
    /// Statement(s) creating `injector`
    fn setup(&self, graph: &DependencyGraph) -> String;
    /// Expression statement obtaining and using the top-level object
    fn request(&self, toplevel: usize) -> String;
}

fn include_guard(i: usize, body: &str) -> String {
    format!("#ifndef COMPONENT{i}_H\n#define COMPONENT{i}_H\n\n{body}\n#endif\n")
}

fn interface(i: usize) -> String {
    format!("struct Interface{i} {{\n  virtual ~Interface{i}() = default;\n  virtual void f() = 0;\n}};\n")
}

fn dep_includes(deps: &[usize]) -> String {
    deps.iter()
        .map(|d| format!("#include \"component{d}.h\"\n"))
        .collect()
}

fn shared_ptr_params(deps: &[usize]) -> String {
    deps.iter()
        .map(|d| format!("std::shared_ptr<Interface{d}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

struct FruitGenerator;

impl SourceGenerator for FruitGenerator {
    fn component_header(&self, i: usize, _deps: &[usize]) -> String {
        include_guard(
            i,
            &format!(
                "#include <fruit/fruit.h>\n\n{}\nfruit::Component<Interface{i}> getInterface{i}Component();\n",
                interface(i)
            ),
        )
    }

    fn component_source(&self, i: usize, deps: &[usize]) -> String {
        let mut out = format!("#include \"component{i}.h\"\n{}\n", dep_includes(deps));
        out.push_str(&format!(
            "namespace {{\nstruct X{i} : public Interface{i} {{\n  INJECT(X{i}({})) {{}}\n  void f() override {{}}\n}};\n}}\n\n",
            shared_ptr_params(deps)
        ));
        out.push_str(&format!(
            "fruit::Component<Interface{i}> getInterface{i}Component() {{\n  return fruit::createComponent()\n"
        ));
        for d in deps {
            out.push_str(&format!("      .install(getInterface{d}Component)\n"));
        }
        out.push_str(&format!("      .bind<Interface{i}, X{i}>();\n}}\n"));
        out
    }

    fn main_includes(&self, graph: &DependencyGraph) -> Vec<usize> {
        vec![graph.toplevel()]
    }

    fn setup(&self, graph: &DependencyGraph) -> String {
        let top = graph.toplevel();
        format!("fruit::Injector<Interface{top}> injector(getInterface{top}Component);")
    }

    fn request(&self, toplevel: usize) -> String {
        format!("injector.get<std::shared_ptr<Interface{toplevel}>>()->f();")
    }
}

struct BoostDiGenerator;

impl SourceGenerator for BoostDiGenerator {
    fn component_header(&self, i: usize, deps: &[usize]) -> String {
        let mut body = String::from("#include <boost/di.hpp>\n#include <memory>\n\n");
        for d in deps {
            body.push_str(&format!("struct Interface{d};\n"));
        }
        body.push_str(&interface(i));
        let ctor = if deps.is_empty() {
            format!("X{i}() {{}}")
        } else {
            format!("BOOST_DI_INJECT(X{i}, {}) {{}}", shared_ptr_params(deps))
        };
        body.push_str(&format!(
            "\nstruct X{i} : public Interface{i} {{\n  {ctor}\n  void f() override;\n}};\n"
        ));
        include_guard(i, &body)
    }

    fn component_source(&self, i: usize, _deps: &[usize]) -> String {
        format!("#include \"component{i}.h\"\n\nvoid X{i}::f() {{}}\n")
    }

    fn main_includes(&self, graph: &DependencyGraph) -> Vec<usize> {
        (0..graph.len()).collect()
    }

    fn setup(&self, graph: &DependencyGraph) -> String {
        let bindings: Vec<String> = (0..graph.len())
            .map(|i| format!("      boost::di::bind<Interface{i}>().to<X{i}>()"))
            .collect();
        format!("auto injector = boost::di::make_injector(\n{});", bindings.join(",\n"))
    }

    fn request(&self, toplevel: usize) -> String {
        format!("injector.create<std::shared_ptr<Interface{toplevel}>>()->f();")
    }
}

struct SimpleDiGenerator;

impl SourceGenerator for SimpleDiGenerator {
    fn component_header(&self, i: usize, _deps: &[usize]) -> String {
        include_guard(
            i,
            &format!(
                "#include <memory>\n\n{}\nstd::shared_ptr<Interface{i}> getInterface{i}();\n",
                interface(i)
            ),
        )
    }

    fn component_source(&self, i: usize, deps: &[usize]) -> String {
        let args: Vec<String> = deps.iter().map(|d| format!("getInterface{d}()")).collect();
        format!(
            "#include \"component{i}.h\"\n{}\nnamespace {{\nstruct X{i} : public Interface{i} {{\n  X{i}({}) {{}}\n  void f() override {{}}\n}};\n}}\n\nstd::shared_ptr<Interface{i}> getInterface{i}() {{\n  return std::make_shared<X{i}>({});\n}}\n",
            dep_includes(deps),
            shared_ptr_params(deps),
            args.join(", ")
        )
    }

    fn main_includes(&self, graph: &DependencyGraph) -> Vec<usize> {
        vec![graph.toplevel()]
    }

    fn setup(&self, graph: &DependencyGraph) -> String {
        format!("auto injector = &getInterface{};", graph.toplevel())
    }

    fn request(&self, _toplevel: usize) -> String {
        "injector()->f();".to_string()
    }
}

fn generate_main(generator: &dyn SourceGenerator, graph: &DependencyGraph, runtime_bench_code: bool) -> String {
    let mut out: String = generator
        .main_includes(graph)
        .iter()
        .map(|i| format!("#include \"component{i}.h\"\n"))
        .collect();
    let setup = generator.setup(graph);
    let request = generator.request(graph.toplevel());

    if !runtime_bench_code {
        out.push_str(&format!(
            "\nint main() {{\n  {setup}\n  {request}\n  return 0;\n}}\n"
        ));
        return out;
    }

    out.push_str("#include <chrono>\n#include <cstdlib>\n#include <iostream>\n");
    out.push_str(&format!(
        r#"
int main(int argc, char* argv[]) {{
  if (argc != 2) {{
    std::cerr << "Usage: " << argv[0] << " <num_loops>" << std::endl;
    return 1;
  }}
  std::size_t num_loops = std::strtoul(argv[1], nullptr, 10);
  using clock = std::chrono::high_resolution_clock;
  double setup_time = 0;
  double per_request_time = 0;
  for (std::size_t i = 0; i < num_loops; i++) {{
    clock::time_point start = clock::now();
    {setup}
    clock::time_point after_setup = clock::now();
    {request}
    clock::time_point end = clock::now();
    setup_time += std::chrono::duration<double>(after_setup - start).count();
    per_request_time += std::chrono::duration<double>(end - after_setup).count();
  }}
  std::cout << "setup_time = " << setup_time / num_loops << std::endl;
  std::cout << "per_request_time = " << per_request_time / num_loops << std::endl;
  return 0;
}}
"#
    ));
    out
}

/// Every file of a generated project except the Makefile, by file name
pub fn generate_files(
    library: DiLibrary,
    graph: &DependencyGraph,
    runtime_bench_code: bool,
) -> BTreeMap<String, String> {
    let generator = library.generator();
    let mut files = BTreeMap::new();
    for i in 0..graph.len() {
        let deps = graph.deps(i);
        files.insert(format!("component{i}.h"), generator.component_header(i, deps));
        files.insert(format!("component{i}.cpp"), generator.component_source(i, deps));
    }
    files.insert(
        "main.cpp".to_string(),
        generate_main(generator, graph, runtime_bench_code),
    );
    files
}

/// What to generate
#[derive(Debug, Clone)]
pub struct ProjectSpec {
    /// Library wiring the components
    pub library: DiLibrary,
    /// Number of non-top-level components
    pub num_classes: usize,
    /// Compiler invocation for each source, without `-c`/`-o`
    pub compile_command: String,
    /// Linker invocation, without objects or `-o`
    pub link_command: String,
    /// Arguments after the objects, e.g. libraries
    pub link_suffix: String,
    /// Whether `main` takes a loop count and prints timings
    pub runtime_bench_code: bool,
}

/// A generated project on disk
#[derive(Debug, Clone)]
pub struct GeneratedProject {
    /// Project directory, also the `make` working directory
    pub dir: PathBuf,
    /// Headers of the non-top-level components, by index
    pub headers: Vec<PathBuf>,
    /// Path `make` links to
    pub executable: PathBuf,
}

/// Write the project described by `spec` into `dir`
pub fn write_project(spec: &ProjectSpec, dir: &Path) -> anyhow::Result<GeneratedProject> {
    let graph = DependencyGraph::generate(spec.num_classes, GRAPH_SEED);
    let files = generate_files(spec.library, &graph, spec.runtime_bench_code);

    for (name, content) in &files {
        let path = dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("Could not write {}", path.display()))?;
    }

    let sources: Vec<String> = files.keys().filter(|name| name.ends_with(".cpp")).cloned().collect();
    let makefile = emit_makefile(
        &sources,
        "main",
        &spec.compile_command,
        &spec.link_command,
        &spec.link_suffix,
    )?;
    let makefile_path = dir.join("Makefile");
    std::fs::write(&makefile_path, makefile)
        .with_context(|| format!("Could not write {}", makefile_path.display()))?;

    Ok(GeneratedProject {
        dir: dir.to_path_buf(),
        headers: (0..spec.num_classes)
            .map(|i| dir.join(format!("component{i}.h")))
            .collect(),
        executable: dir.join("main"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_is_deterministic_dag() {
        let a = DependencyGraph::generate(100, GRAPH_SEED);
        let b = DependencyGraph::generate(100, GRAPH_SEED);
        assert_eq!(a, b);
        assert_eq!(a.len(), 101);
        for i in 0..10 {
            assert!(a.deps(i).is_empty());
        }
        for i in 10..100 {
            assert_eq!(a.deps(i).len(), 10);
            assert!(a.deps(i).iter().all(|&d| d < i));
        }
    }

    #[test]
    fn test_toplevel_covers_unreferenced_components() {
        let graph = DependencyGraph::generate(50, 7);
        let top = graph.toplevel();
        // The last regular component can't be anyone's dependency
        assert!(graph.deps(top).contains(&49));
        for &root in graph.deps(top) {
            assert!((0..top).all(|i| !graph.deps(i).contains(&root)));
        }
    }

    #[test]
    fn test_tiny_graph() {
        let graph = DependencyGraph::generate(3, GRAPH_SEED);
        assert!(graph.deps(0).is_empty());
        assert_eq!(graph.deps(1), &[0]);
        assert_eq!(graph.deps(2).len(), 2);
    }

    #[test]
    fn test_split_benchmark_name() {
        assert_eq!(
            DiLibrary::split_benchmark_name("boost_di_compile_time"),
            Some((DiLibrary::BoostDi, "compile_time"))
        );
        assert_eq!(
            DiLibrary::split_benchmark_name("fruit_incremental_compile_time"),
            Some((DiLibrary::Fruit, "incremental_compile_time"))
        );
        assert_eq!(DiLibrary::split_benchmark_name("new_delete_run_time"), None);
    }

    #[test]
    fn test_fruit_sources() {
        let graph = DependencyGraph::generate(20, GRAPH_SEED);
        let files = generate_files(DiLibrary::Fruit, &graph, true);
        assert_eq!(files.len(), 2 * 21 + 1);
        let source = &files["component15.cpp"];
        assert!(source.contains("INJECT(X15("));
        assert!(source.contains(".bind<Interface15, X15>();"));
        let main = &files["main.cpp"];
        assert!(main.contains("#include \"component20.h\""));
        assert!(main.contains("fruit::Injector<Interface20> injector(getInterface20Component);"));
        assert!(main.contains("\"per_request_time = \""));
    }

    #[test]
    fn test_fruit_component_installs_dependencies_in_order() {
        let graph = DependencyGraph::generate(3, GRAPH_SEED);
        let files = generate_files(DiLibrary::Fruit, &graph, false);
        let source = &files["component1.cpp"];
        assert!(source.ends_with(
            "}\n\nfruit::Component<Interface1> getInterface1Component() {\n  return fruit::createComponent()\n      .install(getInterface0Component)\n      .bind<Interface1, X1>();\n}\n"
        ));
    }

    #[test]
    fn test_boost_di_header_forward_declares_dependencies() {
        let graph = DependencyGraph::generate(3, GRAPH_SEED);
        let files = generate_files(DiLibrary::BoostDi, &graph, false);
        let header = &files["component1.h"];
        assert!(header.contains("#include <memory>\n\nstruct Interface0;\n"));
        assert!(header.contains("\nstruct X1 : public Interface1 {\n"));
        assert!(header.contains("  void f() override;\n};\n"));
    }

    #[test]
    fn test_startup_main_takes_no_arguments() {
        let graph = DependencyGraph::generate(5, GRAPH_SEED);
        let files = generate_files(DiLibrary::SimpleDi, &graph, false);
        let main = &files["main.cpp"];
        assert!(main.contains("int main() {"));
        assert!(main.contains("injector()->f();"));
        assert!(!main.contains("setup_time"));
    }

    #[test]
    fn test_boost_di_main_binds_everything() {
        let graph = DependencyGraph::generate(5, GRAPH_SEED);
        let files = generate_files(DiLibrary::BoostDi, &graph, false);
        let main = &files["main.cpp"];
        for i in 0..graph.len() {
            assert!(main.contains(&format!("boost::di::bind<Interface{i}>().to<X{i}>()")));
        }
    }

    #[test]
    fn test_write_project() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ProjectSpec {
            library: DiLibrary::SimpleDi,
            num_classes: 10,
            compile_command: "g++ -O2".to_string(),
            link_command: "g++".to_string(),
            link_suffix: String::new(),
            runtime_bench_code: false,
        };
        let project = write_project(&spec, dir.path()).unwrap();
        assert_eq!(project.headers.len(), 10);
        assert!(project.headers.iter().all(|h| h.exists()));
        let makefile = std::fs::read_to_string(dir.path().join("Makefile")).unwrap();
        assert!(makefile.contains("main: "));
        assert!(makefile.contains("component10.o"));
    }
}
