//! Shared fixtures for library tests.

use std::fs;
use std::path::{Path, PathBuf};

use sebs_lib::build::{BuildPaths, BuildRequest};
use sebs_lib::cache::ArtifactCache;
use sebs_lib::platform::Arch;
use sebs_lib::types::Language;
use tempfile::TempDir;

pub const BENCHMARK: &str = "110.dynamic-html";
pub const DEPLOYMENT: &str = "local";

pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// An isolated benchmark tree, cache and staging root.
pub struct TestEnv {
  _temp: TempDir,
  pub paths: BuildPaths,
  pub cache_dir: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let benchmarks = temp.path().join("benchmarks");
    let wrappers = benchmarks.join("wrappers");
    let benchmark_dir = benchmarks.join("100.webapps").join(BENCHMARK);

    write_file(
      &benchmark_dir.join("config.json"),
      r#"{"timeout": 10, "memory": 128, "languages": ["python", "nodejs"], "modules": []}"#,
    );
    write_file(
      &benchmark_dir.join("python/function.py"),
      "from jinja2 import Template\n\ndef handler(event):\n    return {'result': event}\n",
    );
    write_file(&benchmark_dir.join("python/requirements.txt"), "jinja2>=2.10.3\n");
    write_file(&benchmark_dir.join("python/templates/template.html"), "<html></html>\n");
    write_file(&wrappers.join("local/python/handler.py"), "import function\n");

    let paths = BuildPaths {
      benchmarks,
      wrappers,
      build: temp.path().join("build"),
    };
    let cache_dir = temp.path().join("cache");

    Self {
      _temp: temp,
      paths,
      cache_dir,
    }
  }

  pub fn open_cache(&self) -> ArtifactCache {
    ArtifactCache::open(&self.cache_dir).unwrap()
  }

  pub fn source(&self, name: &str) -> PathBuf {
    self.paths.benchmarks.join("100.webapps").join(BENCHMARK).join("python").join(name)
  }

  /// The cache file of the fixture benchmark.
  pub fn benchmark_file(&self) -> PathBuf {
    self.cache_dir.join(BENCHMARK).join("config.json")
  }

  pub fn request(&self) -> BuildRequest {
    BuildRequest::new(DEPLOYMENT, BENCHMARK, Language::Python, "3.9", Arch::X64)
  }
}
