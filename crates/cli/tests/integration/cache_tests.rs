use predicates::prelude::*;
use serde_json::Value;

use super::common::{BENCHMARK, TestEnv};

#[test]
fn list_shows_built_benchmark() {
  let env = TestEnv::with_benchmark();
  env.sebs_cmd().args(["build", BENCHMARK, "--arch", "x64"]).assert().success();

  env
    .sebs_cmd()
    .args(["cache", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("110.dynamic-html (local): 1 artifact(s), 0 function(s)"));
}

#[test]
fn list_json_output_is_valid() {
  let env = TestEnv::with_benchmark();
  env.sebs_cmd().args(["build", BENCHMARK, "--arch", "x64"]).assert().success();

  let output = env
    .sebs_cmd()
    .args(["cache", "list", "-o", "json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let list: Value = serde_json::from_slice(&output).unwrap();

  assert_eq!(list[0]["benchmark"], BENCHMARK);
  assert_eq!(list[0]["artifacts"], 1);
}

#[test]
fn show_prints_artifact_record() {
  let env = TestEnv::with_benchmark();
  env.sebs_cmd().args(["build", BENCHMARK, "--arch", "x64"]).assert().success();

  let output = env
    .sebs_cmd()
    .args(["cache", "show", BENCHMARK, "-o", "json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let index: Value = serde_json::from_slice(&output).unwrap();

  let artifact = &index["local"]["python"]["code_package"]["3.9-x64"];
  assert_eq!(
    artifact["location"],
    "110.dynamic-html/local/python/3.9/x64/package/110.dynamic-html.zip"
  );
  assert!(artifact["date"]["created"].is_string());
}

#[test]
fn show_unknown_benchmark() {
  let env = TestEnv::empty();

  env
    .sebs_cmd()
    .args(["cache", "show", "999.missing"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing cached"));
}
