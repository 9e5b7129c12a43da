//! Ordering, concurrency and recovery properties of the artifact cache.

use std::fs;
use std::sync::Arc;
use std::thread;

use sebs_lib::build::{BuildPipeline, ZipPackager};
use sebs_lib::cache::{ArtifactCache, CacheError, FunctionRecord};
use sebs_lib::config::SystemsConfig;
use sebs_lib::types::Language;
use serde_json::{Value, json};

use super::common::{BENCHMARK, DEPLOYMENT, TestEnv};

fn record(name: &str, hash: &str) -> FunctionRecord {
  FunctionRecord {
    name: name.to_string(),
    benchmark: BENCHMARK.to_string(),
    language: Language::Python,
    code_package: hash.to_string(),
    triggers: vec![json!({ "type": "library" })],
    config: json!({ "timeout": 10, "memory": 128 }),
  }
}

/// Build the fixture once so functions have an artifact to point at.
fn built(env: &TestEnv, cache: &ArtifactCache) -> String {
  let systems = SystemsConfig::default();
  let pipeline = BuildPipeline::new(cache, &systems, env.paths.clone());
  pipeline.build(&env.request(), &ZipPackager).unwrap().hash
}

#[test]
fn function_before_artifact_is_rejected() {
  let env = TestEnv::new();
  let cache = env.open_cache();

  let result = cache.add_function(DEPLOYMENT, BENCHMARK, Language::Python, record("fn", "deadbeef"));

  assert!(matches!(result, Err(CacheError::MissingArtifact { .. })));
  assert!(!env.benchmark_file().exists());
}

#[test]
fn concurrent_add_function_keeps_both_records() {
  let env = TestEnv::new();
  let cache = Arc::new(env.open_cache());
  let hash = built(&env, &cache);

  let handles: Vec<_> = ["sebs-fn-a", "sebs-fn-b"]
    .into_iter()
    .map(|name| {
      let cache = Arc::clone(&cache);
      let hash = hash.clone();
      thread::spawn(move || cache.add_function(DEPLOYMENT, BENCHMARK, Language::Python, record(name, &hash)))
    })
    .collect();
  for handle in handles {
    handle.join().unwrap().unwrap();
  }

  let on_disk: Value = serde_json::from_str(&fs::read_to_string(env.benchmark_file()).unwrap()).unwrap();
  let functions = on_disk[DEPLOYMENT]["python"]["functions"].as_object().unwrap();
  assert!(functions.contains_key("sebs-fn-a"));
  assert!(functions.contains_key("sebs-fn-b"));

  let reopened = env.open_cache();
  assert_eq!(reopened.get_functions(DEPLOYMENT, BENCHMARK, Language::Python).len(), 2);
}

#[test]
fn corrupt_cache_file_is_recovered() {
  let env = TestEnv::new();
  {
    let cache = env.open_cache();
    let hash = built(&env, &cache);
    cache
      .add_function(DEPLOYMENT, BENCHMARK, Language::Python, record("fn", &hash))
      .unwrap();
  }
  fs::write(env.benchmark_file(), "{\"local\": {\"python\": ").unwrap();

  let cache = env.open_cache();
  assert!(cache.get_artifact(&env.request().key()).is_none());
  assert!(cache.get_functions(DEPLOYMENT, BENCHMARK, Language::Python).is_empty());

  // The orphaned payload is replaced and the file rewritten.
  let hash = built(&env, &cache);
  let on_disk: Value = serde_json::from_str(&fs::read_to_string(env.benchmark_file()).unwrap()).unwrap();
  assert_eq!(on_disk[DEPLOYMENT]["python"]["code_package"]["3.9-x64"]["hash"], hash.as_str());
}

#[test]
fn provider_config_persists_after_shutdown() {
  let env = TestEnv::new();
  let cache = env.open_cache();
  cache.update_provider_config_value("aws", &["credentials", "account_id"], json!("123456789012")).unwrap();
  cache.update_provider_config_value("aws", &["resources", "lambda-role"], json!("arn:aws:iam::role/sebs")).unwrap();
  cache.shutdown().unwrap();

  let provider: Value = serde_json::from_str(&fs::read_to_string(env.cache_dir.join("aws.json")).unwrap()).unwrap();
  assert_eq!(provider["credentials"]["account_id"], "123456789012");
  assert_eq!(provider["resources"]["lambda-role"], "arn:aws:iam::role/sebs");
}
