use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn set_then_get_roundtrip() {
  let env = TestEnv::empty();

  env
    .sebs_cmd()
    .args(["config", "set", "aws", "resources.lambda-role", "arn:aws:iam::123:role/sebs"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Updated aws.resources.lambda-role"));

  env
    .sebs_cmd()
    .args(["config", "set", "aws", "resources.http-apis", r#"{"fn": "id-1"}"#])
    .assert()
    .success();

  env
    .sebs_cmd()
    .args(["config", "get", "aws"])
    .assert()
    .success()
    .stdout(predicate::str::contains("arn:aws:iam::123:role/sebs"))
    .stdout(predicate::str::contains("id-1"));

  assert!(env.cache_path().join("aws.json").exists());
}

#[test]
fn empty_key_rejected() {
  let env = TestEnv::empty();

  env
    .sebs_cmd()
    .args(["config", "set", "aws", ".", "1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Key path must not be empty"));
}

#[test]
fn deployment_outside_cache_rejected() {
  let env = TestEnv::empty();

  env
    .sebs_cmd()
    .args(["config", "set", "../aws", "region", "us-east-1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid deployment ../aws"));

  assert!(!env.cache_path().parent().unwrap().join("aws.json").exists());
}
