//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const BENCHMARK: &str = "110.dynamic-html";

/// Isolated test environment.
///
/// Each test gets its own benchmark tree, cache and staging root.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an empty test environment.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// An environment with a python `110.dynamic-html` benchmark and a `local` wrapper.
  pub fn with_benchmark() -> Self {
    let env = Self::empty();
    env.write_file(
      "benchmarks/100.webapps/110.dynamic-html/config.json",
      r#"{"timeout": 10, "memory": 128, "languages": ["python"], "modules": []}"#,
    );
    env.write_file(
      "benchmarks/100.webapps/110.dynamic-html/python/function.py",
      "def handler(event):\n    return event\n",
    );
    env.write_file(
      "benchmarks/100.webapps/110.dynamic-html/python/requirements.txt",
      "jinja2>=2.10.3\n",
    );
    env.write_file("benchmarks/wrappers/local/python/handler.py", "import function\n");
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Cache root (isolated per test).
  pub fn cache_path(&self) -> PathBuf {
    let p = self.temp.path().join("cache");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn benchmarks_path(&self) -> PathBuf {
    self.temp.path().join("benchmarks")
  }

  /// Get a pre-configured Command for the sebs binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `SEBS_CACHE`: Isolated cache root
  /// - `SEBS_BENCHMARKS`: Isolated benchmark tree
  /// - `XDG_CACHE_HOME`: Isolated fallback cache path
  ///
  /// and points `--systems` at a file that does not exist, so no builder
  /// container is ever started.
  pub fn sebs_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("sebs");
    cmd.env("SEBS_CACHE", self.cache_path());
    cmd.env("SEBS_BENCHMARKS", self.benchmarks_path());
    cmd.env("XDG_CACHE_HOME", self.temp.path().join("xdg"));
    cmd.env_remove("SEBS_WRAPPERS");
    cmd.env_remove("SEBS_BUILD_DIR");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--systems").arg(self.temp.path().join("systems.json"));
    cmd
  }
}
