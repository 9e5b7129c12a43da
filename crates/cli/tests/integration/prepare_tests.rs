use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn sleep_input_for_size() {
  let env = TestEnv::empty();

  let output = env
    .sebs_cmd()
    .args(["prepare", "010.sleep", "--size", "small", "-o", "json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let input: Value = serde_json::from_slice(&output).unwrap();

  assert_eq!(input["sleep"], 100);
}

#[test]
fn compression_uploads_into_storage_dir() {
  let env = TestEnv::empty();
  env.write_file("data/acmart/main.tex", "\\documentclass{acmart}");
  let storage = env.temp.path().join("storage");

  env
    .sebs_cmd()
    .args(["prepare", "311.compression", "--data-dir"])
    .arg(env.temp.path().join("data"))
    .arg("--storage-dir")
    .arg(&storage)
    .assert()
    .success()
    .stdout(predicate::str::contains("Input prepared for 311.compression (test)"));

  assert!(storage.join("311.compression-0-input/acmart/main.tex").exists());
}

#[test]
fn unknown_benchmark_fails() {
  let env = TestEnv::empty();

  env
    .sebs_cmd()
    .args(["prepare", "999.unknown"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no input generator"));
}
