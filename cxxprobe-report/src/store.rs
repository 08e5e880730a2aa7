//! Append-only JSON-lines result store
//!
//! Each completed benchmark is written as one line and flushed immediately,
//! so an interrupted run loses at most the benchmark in flight. When resuming,
//! the existing file is read first and benchmarks already recorded are skipped.

use crate::error::ReportError;
use crate::record::BenchmarkRecord;
use cxxprobe_core::ParameterMapping;
use fxhash::FxHashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Read every record from a JSON-lines file. Blank lines are ignored.
pub fn load_records(path: &Path) -> Result<Vec<BenchmarkRecord>, ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// The output file of a benchmark run
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    file: File,
    completed: FxHashSet<ParameterMapping>,
}

impl ResultStore {
    /// Open the store. With `resume`, existing records are kept and
    /// remembered; otherwise the file is truncated.
    pub fn open(path: impl Into<PathBuf>, resume: bool) -> Result<Self, ReportError> {
        let path = path.into();
        let io_err = |source| ReportError::Io {
            path: path.clone(),
            source,
        };

        let mut completed = FxHashSet::default();
        let file = if resume {
            if path.exists() {
                let records = load_records(&path)?;
                info!(
                    "Resuming: {} benchmark(s) already recorded in {}",
                    records.len(),
                    path.display()
                );
                completed.extend(records.into_iter().map(|r| r.benchmark));
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(io_err)?
        } else {
            File::create(&path).map_err(io_err)?
        };

        Ok(Self {
            path,
            file,
            completed,
        })
    }

    /// Path of the results file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a benchmark with exactly these parameters is already recorded
    pub fn is_completed(&self, benchmark: &ParameterMapping) -> bool {
        self.completed.contains(benchmark)
    }

    /// Number of recorded benchmarks
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Append one record and flush it to disk
    pub fn append(&mut self, record: &BenchmarkRecord) -> Result<(), ReportError> {
        let mut line = serde_json::to_string(record).map_err(ReportError::Serialize)?;
        line.push('\n');
        let io_err = |source| ReportError::Io {
            path: self.path.clone(),
            source,
        };
        self.file.write_all(line.as_bytes()).map_err(io_err)?;
        self.file.flush().map_err(io_err)?;
        self.completed.insert(record.benchmark.clone());
        Ok(())
    }
}
