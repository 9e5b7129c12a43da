//! Implementation of the `sebs cache` commands.

use anyhow::{Context, Result};

use sebs_lib::cache::ArtifactCache;

use super::Workspace;
use crate::output::{CacheSummary, OutputFormat, print_benchmark_index, print_cache_summaries, print_json};

fn open(workspace: &Workspace) -> Result<ArtifactCache> {
  ArtifactCache::open(&workspace.cache).with_context(|| format!("Failed to open cache at {}", workspace.cache.display()))
}

pub fn cmd_cache_list(workspace: &Workspace, output: OutputFormat) -> Result<()> {
  let cache = open(workspace)?;
  let summaries: Vec<CacheSummary> = cache
    .list_benchmarks()
    .context("Failed to list cached benchmarks")?
    .into_iter()
    .map(|name| {
      let index = cache.get_benchmark_index(&name);
      CacheSummary::new(name, &index)
    })
    .collect();

  if output.is_json() {
    return print_json(&summaries);
  }
  print_cache_summaries(&summaries);
  Ok(())
}

pub fn cmd_cache_show(workspace: &Workspace, benchmark: &str, output: OutputFormat) -> Result<()> {
  let cache = open(workspace)?;
  let index = cache.get_benchmark_index(benchmark);

  if output.is_json() {
    return print_json(&index);
  }
  print_benchmark_index(benchmark, &index);
  Ok(())
}
