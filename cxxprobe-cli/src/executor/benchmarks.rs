//! Concrete Benchmarks
//!
//! Benchmark names are `<library>_<kind>` for generated projects, plus two
//! standalone benchmarks compiled from the library's own benchmark sources:
//!
//! | Kind | Prepare | Run |
//! |---|---|---|
//! | `compile_time` | generate sources | `make clean`, time `make` |
//! | `incremental_compile_time` | generate, build | touch 5 headers, time `make` |
//! | `run_time` | generate, build | run `main <loops>`, parse `name = value` lines |
//! | `startup_time` | generate, build, strip | time 1000 runs of `main` |
//! | `executable_size` | generate, build, strip | `wc -c main` |

use super::generation::{DiLibrary, GeneratedProject, ProjectSpec, write_project};
use super::runner::{Benchmark, Measurements};
use crate::planner::ToolchainKey;
use anyhow::{Context, bail};
use cxxprobe_core::{
    CommandEnv, CommandLine, Compiler, CompilerFamily, EXECUTABLE_SUFFIX, ParameterMapping,
    ensure_empty_dir, run_command,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Runs of the executable per startup-time measurement
const STARTUP_RUNS: usize = 1000;

/// Headers touched per incremental build
const HEADERS_TO_TOUCH: usize = 5;

/// Total inner-loop iterations of a run-time benchmark at `loop_factor = 1`
const RUN_TIME_TOTAL_LOOPS: f64 = 40_000_000.0;

/// Directories shared by every benchmark of a run
#[derive(Debug, Clone)]
pub struct BenchmarkEnvironment {
    /// Fruit checkout under test
    pub fruit_sources_dir: PathBuf,
    /// Checkout holding `extras/benchmark`
    pub fruit_benchmark_sources_dir: PathBuf,
    /// Boost.DI checkout, needed by `boost_di_*` benchmarks
    pub boost_di_sources_dir: Option<PathBuf>,
    /// Fruit build tree for the current toolchain group
    pub fruit_build_dir: PathBuf,
    /// Scratch directory, exclusive to the benchmark in flight
    pub work_dir: PathBuf,
    /// `make -j` value
    pub make_jobs: usize,
}

impl BenchmarkEnvironment {
    /// Lay out build and scratch directories under `scratch_root`
    pub fn new(
        fruit_sources_dir: PathBuf,
        fruit_benchmark_sources_dir: PathBuf,
        boost_di_sources_dir: Option<PathBuf>,
        scratch_root: &Path,
    ) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            fruit_sources_dir,
            fruit_benchmark_sources_dir,
            boost_di_sources_dir,
            fruit_build_dir: scratch_root.join("fruit-build"),
            work_dir: scratch_root.join("benchmark"),
            make_jobs: cpus + 1,
        }
    }

    /// Checkout whose commit identifies the code a benchmark measures
    pub fn code_under_test(&self, benchmark: &ParameterMapping) -> Option<&Path> {
        let name = benchmark.get_str("name")?;
        if name.starts_with("fruit_") {
            Some(&self.fruit_sources_dir)
        } else if name.starts_with("boost_di_") {
            self.boost_di_sources_dir.as_deref()
        } else {
            None
        }
    }

    fn make(&self, dir: &Path) -> CommandLine {
        CommandLine::new("make")
            .args(["-j".to_string(), self.make_jobs.to_string()])
            .cwd(dir)
            .env(CommandEnv::capture())
    }

    fn fruit_include_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.fruit_sources_dir.join("include"),
            self.fruit_build_dir.join("include"),
        ]
    }
}

/// Configure and build Fruit for one toolchain group into a fresh build tree
pub fn build_fruit(env: &BenchmarkEnvironment, toolchain: &ToolchainKey) -> anyhow::Result<()> {
    info!(
        "Building Fruit with {} {:?} in {}",
        toolchain.compiler,
        toolchain.cmake_args,
        env.fruit_build_dir.display()
    );
    ensure_empty_dir(&env.fruit_build_dir)
        .with_context(|| format!("Could not prepare {}", env.fruit_build_dir.display()))?;

    let cmake = CommandLine::new("cmake")
        .arg(env.fruit_sources_dir.display().to_string())
        .arg("-DCMAKE_BUILD_TYPE=Release")
        .args(toolchain.cmake_args.iter().cloned())
        .cwd(&env.fruit_build_dir)
        .env(CommandEnv::capture().with("CXX", toolchain.compiler.clone()));
    run_command(&cmake)?;
    run_command(&env.make(&env.fruit_build_dir))?;
    Ok(())
}

fn required_str<'a>(params: &'a ParameterMapping, name: &str) -> anyhow::Result<&'a str> {
    params
        .get_str(name)
        .with_context(|| format!("Benchmark {} needs a string '{}' dimension", params, name))
}

fn required_count(params: &ParameterMapping, name: &str) -> anyhow::Result<usize> {
    params
        .get(name)
        .and_then(|v| v.as_i64())
        .and_then(|n| usize::try_from(n).ok())
        .with_context(|| format!("Benchmark {} needs a non-negative integer '{}' dimension", params, name))
}

fn optional_f64(params: &ParameterMapping, name: &str, default: f64) -> anyhow::Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value
            .as_f64()
            .with_context(|| format!("Dimension '{}' of {} must be a number", name, params)),
    }
}

fn generation_flags(params: &ParameterMapping) -> Vec<String> {
    params
        .get("benchmark_generation_flags")
        .map(|v| v.to_string_list())
        .unwrap_or_default()
}

fn run_time_loops(params: &ParameterMapping, num_classes: usize) -> anyhow::Result<u64> {
    let loop_factor = optional_f64(params, "loop_factor", 1.0)?;
    let loops = RUN_TIME_TOTAL_LOOPS * loop_factor / num_classes.max(1) as f64;
    Ok((loops as u64).max(1))
}

fn timed(command: &CommandLine) -> anyhow::Result<f64> {
    let start = Instant::now();
    run_command(command)?;
    Ok(start.elapsed().as_secs_f64())
}

/// Parse `name = value` lines printed by a benchmark executable
pub fn parse_measurements(output: &str) -> anyhow::Result<Measurements> {
    let mut measurements = Measurements::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once('=') else {
            bail!("Expected 'name = value', got: {}", line);
        };
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid number in: {}", line))?;
        measurements.insert(name.trim().to_string(), value);
    }
    Ok(measurements)
}

/// Evenly spaced picks from `items`, all of them when there are few
fn evenly_spaced<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    if items.len() <= count {
        return items.to_vec();
    }
    (0..count).map(|i| items[i * items.len() / count].clone()).collect()
}

/// What a generated-project benchmark measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKind {
    /// Clean build time
    CompileTime,
    /// Rebuild time after touching a few headers
    IncrementalCompileTime,
    /// Injector setup and per-request time
    RunTime,
    /// Time to start and exit the executable
    StartupTime,
    /// Stripped executable size
    ExecutableSize,
}

impl GeneratedKind {
    /// Parse the part of a benchmark name after the library prefix
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "compile_time" => Some(GeneratedKind::CompileTime),
            "incremental_compile_time" => Some(GeneratedKind::IncrementalCompileTime),
            "run_time" => Some(GeneratedKind::RunTime),
            "startup_time" => Some(GeneratedKind::StartupTime),
            "executable_size" => Some(GeneratedKind::ExecutableSize),
            _ => None,
        }
    }

    fn needs_build(self) -> bool {
        self != GeneratedKind::CompileTime
    }

    fn needs_strip(self) -> bool {
        matches!(self, GeneratedKind::StartupTime | GeneratedKind::ExecutableSize)
    }
}

/// Benchmark over a generated project
struct GeneratedSourcesBenchmark {
    params: ParameterMapping,
    kind: GeneratedKind,
    spec: ProjectSpec,
    dir: PathBuf,
    make: CommandLine,
    loops: u64,
    project: Option<GeneratedProject>,
    headers_to_touch: Vec<PathBuf>,
}

impl GeneratedSourcesBenchmark {
    fn new(
        params: ParameterMapping,
        library: DiLibrary,
        kind: GeneratedKind,
        env: &BenchmarkEnvironment,
    ) -> anyhow::Result<Self> {
        let compiler = required_str(&params, "compiler")?;
        let cxx_std = required_str(&params, "cxx_std")?;
        let num_classes = required_count(&params, "num_classes")?;

        let (include_dirs, link_suffix) = match library {
            DiLibrary::Fruit => {
                let lib_dir = env.fruit_build_dir.join("src");
                (
                    env.fruit_include_dirs(),
                    format!(
                        "-L{dir} -Wl,-rpath,{dir} -lfruit",
                        dir = lib_dir.display()
                    ),
                )
            }
            DiLibrary::BoostDi => {
                let Some(boost_di) = &env.boost_di_sources_dir else {
                    bail!("--boost-di-sources-dir is required for {}", params);
                };
                (vec![boost_di.join("include")], String::new())
            }
            DiLibrary::SimpleDi => (Vec::new(), String::new()),
        };

        let mut compile = vec![
            compiler.to_string(),
            format!("-std={}", cxx_std),
            "-O2".to_string(),
            "-DNDEBUG".to_string(),
            "-W".to_string(),
            "-Wall".to_string(),
            "-Werror".to_string(),
            "-ftemplate-depth=1000".to_string(),
        ];
        compile.extend(generation_flags(&params));
        compile.extend(include_dirs.iter().map(|dir| format!("-I{}", dir.display())));

        let spec = ProjectSpec {
            library,
            num_classes,
            compile_command: compile.join(" "),
            link_command: format!("{} -std={} -O2", compiler, cxx_std),
            link_suffix,
            runtime_bench_code: kind == GeneratedKind::RunTime,
        };
        let loops = run_time_loops(&params, num_classes)?;

        Ok(Self {
            kind,
            spec,
            dir: env.work_dir.clone(),
            make: env.make(&env.work_dir),
            loops,
            project: None,
            headers_to_touch: Vec::new(),
            params,
        })
    }

    fn project(&self) -> anyhow::Result<&GeneratedProject> {
        self.project
            .as_ref()
            .context("Benchmark was run before it was prepared")
    }

    fn in_dir(&self, program: &str) -> CommandLine {
        CommandLine::new(program)
            .cwd(&self.dir)
            .env(CommandEnv::capture())
    }
}

impl Benchmark for GeneratedSourcesBenchmark {
    fn prepare(&mut self) -> anyhow::Result<()> {
        ensure_empty_dir(&self.dir)
            .with_context(|| format!("Could not prepare {}", self.dir.display()))?;
        let project = write_project(&self.spec, &self.dir)?;

        if self.kind.needs_build() {
            run_command(&self.make)?;
        }
        if self.kind.needs_strip() {
            run_command(
                &self
                    .in_dir("strip")
                    .arg(project.executable.display().to_string()),
            )?;
        }
        if self.kind == GeneratedKind::IncrementalCompileTime {
            self.headers_to_touch = evenly_spaced(&project.headers, HEADERS_TO_TOUCH);
        }
        self.project = Some(project);
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<Measurements> {
        let project = self.project()?;
        let executable = project.executable.display().to_string();
        let mut measurements = Measurements::new();
        match self.kind {
            GeneratedKind::CompileTime => {
                run_command(&self.make.clone().arg("clean"))?;
                measurements.insert("compile_time".to_string(), timed(&self.make)?);
            }
            GeneratedKind::IncrementalCompileTime => {
                let touch = self.in_dir("touch").args(
                    self.headers_to_touch
                        .iter()
                        .map(|h| h.display().to_string()),
                );
                run_command(&touch)?;
                measurements.insert("incremental_compile_time".to_string(), timed(&self.make)?);
            }
            GeneratedKind::RunTime => {
                let output = run_command(&self.in_dir(&executable).arg(self.loops.to_string()))?;
                measurements = parse_measurements(&output.stdout)?;
            }
            GeneratedKind::StartupTime => {
                let command = self.in_dir(&executable);
                let start = Instant::now();
                for _ in 0..STARTUP_RUNS {
                    run_command(&command)?;
                }
                let per_run = start.elapsed().as_secs_f64() / STARTUP_RUNS as f64;
                measurements.insert("startup_time".to_string(), per_run);
            }
            GeneratedKind::ExecutableSize => {
                let output = run_command(&self.in_dir("wc").arg("-c").arg(executable))?;
                let num_bytes: f64 = output
                    .stdout
                    .split_whitespace()
                    .next()
                    .and_then(|n| n.parse().ok())
                    .with_context(|| format!("Unexpected wc output: {}", output.stdout))?;
                measurements.insert("num_bytes".to_string(), num_bytes);
            }
        }
        Ok(measurements)
    }

    fn describe(&self) -> &ParameterMapping {
        &self.params
    }
}

/// Compile time of Fruit's single-file benchmark with `num_bindings` bindings
struct SingleFileCompileBenchmark {
    params: ParameterMapping,
    compiler: Compiler,
    source: PathBuf,
    include_dirs: Vec<PathBuf>,
}

impl SingleFileCompileBenchmark {
    fn new(params: ParameterMapping, env: &BenchmarkEnvironment) -> anyhow::Result<Self> {
        let num_bindings = required_count(&params, "num_bindings")?;
        if num_bindings % 5 != 0 {
            bail!("num_bindings must be a multiple of 5, got {}", num_bindings);
        }
        let mut flags = vec![
            format!("-std={}", required_str(&params, "cxx_std")?),
            "-O2".to_string(),
            "-DNDEBUG".to_string(),
            "-ftemplate-depth=1000".to_string(),
            format!("-DMULTIPLIER={}", num_bindings / 5),
        ];
        flags.extend(generation_flags(&params));
        let compiler = Compiler::new(required_str(&params, "compiler")?, CompilerFamily::Posix)
            .with_std_flags(flags)
            .with_cwd(&env.work_dir);

        Ok(Self {
            compiler,
            source: env
                .fruit_benchmark_sources_dir
                .join("extras/benchmark/compile_time_benchmark.cpp"),
            include_dirs: env.fruit_include_dirs(),
            params,
        })
    }
}

impl Benchmark for SingleFileCompileBenchmark {
    fn prepare(&mut self) -> anyhow::Result<()> {
        if !self.source.is_file() {
            bail!("Benchmark source {} not found", self.source.display());
        }
        ensure_empty_dir(&self.compiler.cwd)
            .with_context(|| format!("Could not prepare {}", self.compiler.cwd.display()))
    }

    fn run(&mut self) -> anyhow::Result<Measurements> {
        let start = Instant::now();
        self.compiler
            .compile_discard(&self.source, &self.include_dirs, &[])?;
        Ok(Measurements::from([(
            "compile_time".to_string(),
            start.elapsed().as_secs_f64(),
        )]))
    }

    fn describe(&self) -> &ParameterMapping {
        &self.params
    }
}

/// Run time of plain `new`/`delete`, the baseline for injector run time
struct NewDeleteBenchmark {
    params: ParameterMapping,
    compiler: Compiler,
    source: PathBuf,
    executable: PathBuf,
    loops: u64,
}

impl NewDeleteBenchmark {
    fn new(params: ParameterMapping, env: &BenchmarkEnvironment) -> anyhow::Result<Self> {
        let num_classes = required_count(&params, "num_classes")?;
        let mut flags = vec![
            format!("-std={}", required_str(&params, "cxx_std")?),
            "-O2".to_string(),
            "-DNDEBUG".to_string(),
            format!("-DMULTIPLIER={}", num_classes),
        ];
        flags.extend(generation_flags(&params));
        let compiler = Compiler::new(required_str(&params, "compiler")?, CompilerFamily::Posix)
            .with_std_flags(flags)
            .with_cwd(&env.work_dir);

        Ok(Self {
            compiler,
            source: env
                .fruit_benchmark_sources_dir
                .join("extras/benchmark/new_delete_benchmark.cpp"),
            executable: env
                .work_dir
                .join(format!("new_delete_benchmark{}", EXECUTABLE_SUFFIX)),
            loops: run_time_loops(&params, num_classes)?,
            params,
        })
    }
}

impl Benchmark for NewDeleteBenchmark {
    fn prepare(&mut self) -> anyhow::Result<()> {
        ensure_empty_dir(&self.compiler.cwd)
            .with_context(|| format!("Could not prepare {}", self.compiler.cwd.display()))?;
        self.compiler
            .compile_and_link(&self.source, &[], &self.executable, &[], &[])?;
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<Measurements> {
        let command = CommandLine::new(&self.executable)
            .arg(self.loops.to_string())
            .cwd(&self.compiler.cwd)
            .env(CommandEnv::capture());
        parse_measurements(&run_command(&command)?.stdout)
    }

    fn describe(&self) -> &ParameterMapping {
        &self.params
    }
}

/// Build the benchmark named by `params["name"]`
pub fn create_benchmark(
    params: ParameterMapping,
    env: &BenchmarkEnvironment,
) -> anyhow::Result<Box<dyn Benchmark>> {
    let name = required_str(&params, "name")?.to_string();
    let benchmark: Box<dyn Benchmark> = match name.as_str() {
        "fruit_single_file_compile_time" => Box::new(SingleFileCompileBenchmark::new(params, env)?),
        "new_delete_run_time" => Box::new(NewDeleteBenchmark::new(params, env)?),
        other => {
            let Some((library, kind)) = DiLibrary::split_benchmark_name(other)
                .and_then(|(library, kind)| GeneratedKind::parse(kind).map(|k| (library, k)))
            else {
                bail!("Unknown benchmark name '{}'", other);
            };
            Box::new(GeneratedSourcesBenchmark::new(params, library, kind, env)?)
        }
    };
    Ok(benchmark)
}
