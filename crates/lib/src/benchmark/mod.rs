//! Benchmark discovery and input preparation.
//!
//! A benchmark is a directory named after the benchmark (`110.dynamic-html`)
//! somewhere below the benchmarks root, usually inside a group directory
//! (`100.webapps`). It holds a `config.json` and one source directory per
//! implemented language.

pub mod input;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::consts::CONFIG_FILENAME;
use crate::types::Language;

/// Group directories are at most this many levels below the benchmarks root.
const MAX_SEARCH_DEPTH: usize = 2;

#[derive(Debug, Error)]
pub enum BenchmarkError {
  #[error("benchmark {name} not found under {root}")]
  NotFound { name: String, root: PathBuf },

  #[error("failed to read benchmark config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse benchmark config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Contents of a benchmark's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
  /// Function timeout in seconds.
  #[serde(default)]
  pub timeout: u64,

  /// Function memory in MiB.
  #[serde(default)]
  pub memory: u64,

  #[serde(default)]
  pub languages: Vec<Language>,

  /// Cloud modules (`storage`, `nosql`) the benchmark uses.
  #[serde(default)]
  pub modules: Vec<String>,
}

/// A located benchmark with its parsed configuration.
#[derive(Debug, Clone)]
pub struct Benchmark {
  pub name: String,
  pub path: PathBuf,
  pub config: BenchmarkConfig,
}

impl Benchmark {
  /// Locate `name` below `root` and load its configuration.
  pub fn find(root: &Path, name: &str) -> Result<Self, BenchmarkError> {
    let path = WalkDir::new(root)
      .min_depth(1)
      .max_depth(MAX_SEARCH_DEPTH)
      .sort_by_file_name()
      .into_iter()
      .filter_map(|e| e.ok())
      .find(|e| e.file_type().is_dir() && e.file_name() == name)
      .map(|e| e.into_path())
      .ok_or_else(|| BenchmarkError::NotFound {
        name: name.to_string(),
        root: root.to_path_buf(),
      })?;

    debug!(benchmark = name, path = %path.display(), "benchmark located");
    Self::load(&path)
  }

  /// Load the benchmark rooted at `path`; its name is the directory name.
  pub fn load(path: &Path) -> Result<Self, BenchmarkError> {
    let config_path = path.join(CONFIG_FILENAME);
    let content = fs::read_to_string(&config_path).map_err(|source| BenchmarkError::Read {
      path: config_path.clone(),
      source,
    })?;
    let config = serde_json::from_str(&content).map_err(|source| BenchmarkError::Parse {
      path: config_path,
      source,
    })?;

    Ok(Self {
      name: path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default(),
      path: path.to_path_buf(),
      config,
    })
  }

  pub fn supports(&self, language: Language) -> bool {
    self.config.languages.contains(&language)
  }

  /// Source directory of one language implementation.
  pub fn language_dir(&self, language: Language) -> PathBuf {
    self.path.join(language.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{BENCHMARK, python_fixture, write_file};
  use tempfile::TempDir;

  #[test]
  fn find_in_group_directory() {
    let temp = TempDir::new().unwrap();
    let fixture = python_fixture(temp.path());

    let benchmark = Benchmark::find(&fixture.benchmarks, BENCHMARK).unwrap();

    assert_eq!(benchmark.name, BENCHMARK);
    assert_eq!(benchmark.path, fixture.benchmark_dir);
    assert_eq!(benchmark.config.memory, 128);
    assert!(benchmark.supports(Language::Python));
    assert_eq!(benchmark.language_dir(Language::Python), fixture.benchmark_dir.join("python"));
  }

  #[test]
  fn find_missing_benchmark() {
    let temp = TempDir::new().unwrap();
    let fixture = python_fixture(temp.path());

    let result = Benchmark::find(&fixture.benchmarks, "999.unknown");
    assert!(matches!(result, Err(BenchmarkError::NotFound { .. })));
  }

  #[test]
  fn find_does_not_descend_into_sources() {
    let temp = TempDir::new().unwrap();
    let fixture = python_fixture(temp.path());
    write_file(&fixture.benchmark_dir.join("python/nested/config.json"), "{}");

    let result = Benchmark::find(&fixture.benchmarks, "nested");
    assert!(matches!(result, Err(BenchmarkError::NotFound { .. })));
  }

  #[test]
  fn load_rejects_unknown_language() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("config.json"), r#"{"languages": ["cobol"]}"#);

    let result = Benchmark::load(temp.path());
    assert!(matches!(result, Err(BenchmarkError::Parse { .. })));
  }

  #[test]
  fn defaults_for_missing_fields() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("config.json"), r#"{"languages": ["nodejs"]}"#);

    let benchmark = Benchmark::load(temp.path()).unwrap();
    assert!(benchmark.supports(Language::Nodejs));
    assert!(!benchmark.supports(Language::Python));
    assert!(benchmark.config.modules.is_empty());
  }
}
