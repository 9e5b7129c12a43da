//! Test fixtures for sebs-lib.
//!
//! Builds a minimal benchmark tree with a deployment wrapper directory so
//! hashing and pipeline tests share one layout.

use std::fs;
use std::path::{Path, PathBuf};

pub const BENCHMARK: &str = "110.dynamic-html";
pub const DEPLOYMENT: &str = "local";

pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// Paths of a fixture workspace.
pub struct Fixture {
  pub benchmarks: PathBuf,
  pub wrappers: PathBuf,
  pub benchmark_dir: PathBuf,
}

impl Fixture {
  pub fn source(&self, name: &str) -> PathBuf {
    self.benchmark_dir.join("python").join(name)
  }

  pub fn wrapper(&self, name: &str) -> PathBuf {
    self.wrappers.join(DEPLOYMENT).join("python").join(name)
  }
}

/// Lay out `<root>/benchmarks/100.webapps/110.dynamic-html` with python sources
/// and `<root>/benchmarks/wrappers/local/python` with a handler.
pub fn python_fixture(root: &Path) -> Fixture {
  let benchmarks = root.join("benchmarks");
  let wrappers = benchmarks.join("wrappers");
  let benchmark_dir = benchmarks.join("100.webapps").join(BENCHMARK);

  write_file(
    &benchmark_dir.join("config.json"),
    r#"{"timeout": 10, "memory": 128, "languages": ["python", "nodejs"], "modules": []}"#,
  );
  write_file(&benchmark_dir.join("python/function.py"), "def handler(event):\n    return event\n");
  write_file(&benchmark_dir.join("python/requirements.txt"), "jinja2>=2.10.3\n");
  write_file(&wrappers.join("local/python/handler.py"), "import function\n");
  write_file(&wrappers.join("local/python/storage.py"), "class storage: pass\n");

  Fixture {
    benchmarks,
    wrappers,
    benchmark_dir,
  }
}
