//! Implementation of the `sebs config` commands.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use sebs_lib::cache::ArtifactCache;

use super::Workspace;
use crate::output::{print_json, print_success};

fn open(workspace: &Workspace) -> Result<ArtifactCache> {
  ArtifactCache::open(&workspace.cache).with_context(|| format!("Failed to open cache at {}", workspace.cache.display()))
}

pub fn cmd_config_get(workspace: &Workspace, deployment: &str) -> Result<()> {
  let cache = open(workspace)?;
  match cache.get_provider_config(deployment) {
    Some(config) => print_json(&config),
    None => bail!("No configuration cached for deployment {}", deployment),
  }
}

pub fn cmd_config_set(workspace: &Workspace, deployment: &str, key: &str, value: &str) -> Result<()> {
  let key_path: Vec<&str> = key.split('.').filter(|k| !k.is_empty()).collect();
  if key_path.is_empty() {
    bail!("Key path must not be empty");
  }
  let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

  let cache = open(workspace)?;
  cache
    .update_provider_config_value(deployment, &key_path, value)
    .with_context(|| format!("Invalid deployment {}", deployment))?;
  cache.shutdown().context("Failed to write provider configuration")?;

  print_success(&format!("Updated {}.{}", deployment, key));
  Ok(())
}
