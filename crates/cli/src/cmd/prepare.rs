//! Implementation of the `sebs prepare` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sebs_lib::benchmark::input::{DirectoryStorage, InputRegistry, prepare_input};
use sebs_lib::cache::ArtifactCache;
use sebs_lib::types::InputSize;

use super::Workspace;
use crate::output::{OutputFormat, print_json, print_success};

pub struct PrepareArgs {
  pub benchmark: String,
  pub deployment: String,
  pub size: InputSize,
  pub data_dir: Option<PathBuf>,
  pub storage_dir: Option<PathBuf>,
}

/// Generate the invocation input of a benchmark and print it.
pub fn cmd_prepare(workspace: &Workspace, args: PrepareArgs, output: OutputFormat) -> Result<()> {
  let cache = ArtifactCache::open(&workspace.cache)
    .with_context(|| format!("Failed to open cache at {}", workspace.cache.display()))?;
  let storage_dir = args.storage_dir.unwrap_or_else(|| workspace.cache.join("storage"));
  let storage = DirectoryStorage::new(storage_dir);
  let registry = InputRegistry::default();

  let input = prepare_input(
    &cache,
    &registry,
    &storage,
    &args.deployment,
    &args.benchmark,
    args.size,
    args.data_dir.as_deref(),
  )
  .with_context(|| format!("Failed to prepare input for {}", args.benchmark))?;

  if !output.is_json() {
    print_success(&format!("Input prepared for {} ({})", args.benchmark, args.size));
  }
  print_json(&input)
}
