//! Build pipeline scenarios: first build, cache hit, stale rebuild,
//! dependency installation.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sebs_lib::build::{
  BuildError, BuildPipeline, BuilderContainerRunner, PackageContext, PackageOutput, Packager, ZipPackager,
};
use sebs_lib::config::SystemsConfig;

use super::common::{BENCHMARK, TestEnv, write_file};

type RunnerCall = (String, PathBuf, BTreeMap<String, String>);

/// Runner recording every installer invocation.
#[derive(Clone, Default)]
struct RecordingRunner {
  calls: Arc<Mutex<Vec<RunnerCall>>>,
}

impl BuilderContainerRunner for RecordingRunner {
  fn run(&self, image: &str, mount_dir: &Path, env: &BTreeMap<String, String>) -> Result<String, BuildError> {
    write_file(&mount_dir.join(".python_packages/jinja2/__init__.py"), "");
    self
      .calls
      .lock()
      .unwrap()
      .push((image.to_string(), mount_dir.to_path_buf(), env.clone()));
    Ok("installed".to_string())
  }
}

/// Runner whose installer always exits non-zero.
struct FailingRunner;

impl BuilderContainerRunner for FailingRunner {
  fn run(&self, image: &str, _mount_dir: &Path, _env: &BTreeMap<String, String>) -> Result<String, BuildError> {
    Err(BuildError::Install {
      image: image.to_string(),
      code: Some(1),
    })
  }
}

/// Systems configuration publishing a python 3.9 builder image for `local`.
fn with_builder_image() -> SystemsConfig {
  serde_json::from_str(
    r#"{
      "general": { "docker_repository": "example/sebs" },
      "local": { "languages": { "python": { "base_images": { "3.9": "python:3.9-slim" }, "images": ["build"] } } }
    }"#,
  )
  .unwrap()
}

/// Zip packager counting how often it is asked to package.
#[derive(Default)]
struct CountingPackager {
  calls: Cell<usize>,
}

impl Packager for CountingPackager {
  fn package(&self, ctx: &PackageContext<'_>) -> Result<PackageOutput, BuildError> {
    self.calls.set(self.calls.get() + 1);
    ZipPackager.package(ctx)
  }
}

#[test]
fn build_reuse_and_rebuild() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = SystemsConfig::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone());
  let packager = CountingPackager::default();
  let request = env.request();

  let first = pipeline.build(&request, &packager).unwrap();
  assert!(first.rebuilt);
  assert!(!first.is_cached);
  assert_eq!(packager.calls.get(), 1);
  let created = cache.get_artifact(&request.key()).unwrap().date.created;

  let second = pipeline.build(&request, &packager).unwrap();
  assert!(!second.rebuilt);
  assert!(second.is_cached);
  assert!(second.is_cached_valid);
  assert_eq!(second.location, first.location);
  assert_eq!(packager.calls.get(), 1);

  write_file(&env.source("function.py"), "def handler(event):\n    return {}\n");

  let third = pipeline.build(&request, &packager).unwrap();
  assert!(third.rebuilt);
  assert!(third.is_cached);
  assert!(!third.is_cached_valid);
  assert_ne!(third.hash, first.hash);
  assert_eq!(packager.calls.get(), 2);

  let artifact = cache.get_artifact(&request.key()).unwrap();
  assert_eq!(artifact.date.created, created);
  assert!(artifact.date.modified >= created);
  assert_eq!(artifact.hash, third.hash);
}

#[test]
fn cache_hit_does_not_touch_staging() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = SystemsConfig::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone());
  pipeline.build(&env.request(), &ZipPackager).unwrap();

  let staged = pipeline.staging_dir(&env.request());
  fs::remove_dir_all(&staged).unwrap();

  let outcome = pipeline.build(&env.request(), &ZipPackager).unwrap();
  assert!(!outcome.rebuilt);
  assert!(!staged.exists());
  assert!(outcome.location.exists());
}

#[test]
fn wrapper_change_invalidates_cache() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = SystemsConfig::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone());
  pipeline.build(&env.request(), &ZipPackager).unwrap();

  write_file(&env.paths.wrappers.join("local/python/handler.py"), "import function\nimport os\n");

  let outcome = pipeline.build(&env.request(), &ZipPackager).unwrap();
  assert!(outcome.rebuilt);
  assert!(!outcome.is_cached_valid);
}

#[test]
fn failed_build_keeps_previous_location() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = SystemsConfig::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone());
  let first = pipeline.build(&env.request(), &ZipPackager).unwrap();

  write_file(&env.source("function.py"), "def handler(event):\n    return 2\n");
  let broken: SystemsConfig =
    serde_json::from_str(r#"{"local": {"languages": {"python": {"deployment": {"files": ["missing.py"]}}}}}"#).unwrap();
  let failing = BuildPipeline::new(&cache, &broken, env.paths.clone());

  let result = failing.build(&env.request(), &ZipPackager);
  assert!(matches!(result, Err(BuildError::Stage(_))));

  let artifact = cache.get_artifact(&env.request().key()).unwrap();
  assert_eq!(artifact.hash, first.hash);
  assert!(cache.resolve(&artifact).exists());
  assert!(failing.staging_dir(&env.request()).exists());
}

#[test]
fn installer_runs_in_staging_dir() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = with_builder_image();
  let runner = RecordingRunner::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone()).with_runner(runner.clone());

  let outcome = pipeline.build(&env.request(), &ZipPackager).unwrap();
  assert!(outcome.rebuilt);

  let calls = runner.calls.lock().unwrap();
  assert_eq!(calls.len(), 1);
  let (image, mount_dir, vars) = &calls[0];
  assert_eq!(image, "example/sebs:build.local.python.3.9");
  assert_eq!(mount_dir, &pipeline.staging_dir(&env.request()));
  assert_eq!(vars["APP"], BENCHMARK);
  assert_eq!(vars["PLATFORM"], "LOCAL");
  assert_eq!(vars["TARGET_ARCHITECTURE"], "x64");
  assert!(mount_dir.join(".python_packages/jinja2/__init__.py").exists());
}

#[test]
fn installer_skipped_without_builder() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let systems = with_builder_image();
  let runner = RecordingRunner::default();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone()).with_runner(runner.clone());

  pipeline.build(&env.request().with_builder(false), &ZipPackager).unwrap();

  assert!(runner.calls.lock().unwrap().is_empty());
}

#[test]
fn installer_failure_keeps_cached_artifact() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  let plain = SystemsConfig::default();
  let first = BuildPipeline::new(&cache, &plain, env.paths.clone())
    .build(&env.request(), &ZipPackager)
    .unwrap();
  let before = cache.get_artifact(&env.request().key()).unwrap();

  write_file(&env.source("function.py"), "def handler(event):\n    return 3\n");
  let systems = with_builder_image();
  let pipeline = BuildPipeline::new(&cache, &systems, env.paths.clone()).with_runner(FailingRunner);
  let packager = CountingPackager::default();

  let result = pipeline.build(&env.request(), &packager);
  assert!(matches!(result, Err(BuildError::Install { code: Some(1), .. })));
  assert_eq!(packager.calls.get(), 0);

  let after = cache.get_artifact(&env.request().key()).unwrap();
  assert_eq!(after, before);
  assert_eq!(cache.resolve(&after), first.location);
  assert!(first.location.exists());
  assert!(pipeline.staging_dir(&env.request()).join("function.py").exists());
}
