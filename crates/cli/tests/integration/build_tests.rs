use predicates::prelude::*;
use serde_json::Value;

use super::common::{BENCHMARK, TestEnv};

fn build_json(env: &TestEnv, extra: &[&str]) -> Value {
  let output = env
    .sebs_cmd()
    .args(["build", BENCHMARK, "--arch", "x64", "-o", "json"])
    .args(extra)
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  serde_json::from_slice(&output).unwrap()
}

#[test]
fn first_build_creates_package() {
  let env = TestEnv::with_benchmark();

  env
    .sebs_cmd()
    .args(["build", BENCHMARK, "--arch", "x64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built local/110.dynamic-html/python/3.9-x64/code_package"));

  let zip = env
    .cache_path()
    .join("110.dynamic-html/local/python/3.9/x64/package/110.dynamic-html.zip");
  assert!(zip.exists());
}

#[test]
fn second_build_uses_cache() {
  let env = TestEnv::with_benchmark();

  let first = build_json(&env, &[]);
  let second = build_json(&env, &[]);

  assert_eq!(first["rebuilt"], true);
  assert_eq!(first["is_cached"], false);
  assert_eq!(second["rebuilt"], false);
  assert_eq!(second["is_cached_valid"], true);
  assert_eq!(second["location"], first["location"]);
}

#[test]
fn source_change_triggers_rebuild() {
  let env = TestEnv::with_benchmark();
  let first = build_json(&env, &[]);

  env.write_file(
    "benchmarks/100.webapps/110.dynamic-html/python/function.py",
    "def handler(event):\n    return {}\n",
  );
  let second = build_json(&env, &[]);

  assert_eq!(second["rebuilt"], true);
  assert_eq!(second["is_cached"], true);
  assert_eq!(second["is_cached_valid"], false);
  assert_ne!(second["hash"], first["hash"]);
}

#[test]
fn force_rebuilds_valid_package() {
  let env = TestEnv::with_benchmark();
  build_json(&env, &[]);

  let forced = build_json(&env, &["--force"]);
  assert_eq!(forced["rebuilt"], true);
  assert_eq!(forced["is_cached_valid"], true);
}

#[test]
fn unsupported_language_fails() {
  let env = TestEnv::with_benchmark();

  env
    .sebs_cmd()
    .args(["build", BENCHMARK, "--arch", "x64", "--language", "nodejs"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("has no nodejs implementation"));
}
