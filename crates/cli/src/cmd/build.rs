//! Implementation of the `sebs build` command.

use std::time::Instant;

use anyhow::{Context, Result};

use sebs_lib::build::{BuildPipeline, BuildRequest, DockerCli, ZipPackager};
use sebs_lib::cache::ArtifactCache;
use sebs_lib::config::SystemsConfig;
use sebs_lib::platform::Arch;
use sebs_lib::types::Language;

use super::Workspace;
use crate::output::{OutputFormat, print_build_outcome, print_json};

pub struct BuildArgs {
  pub benchmark: String,
  pub deployment: String,
  pub language: Language,
  pub language_version: String,
  pub arch: Option<Arch>,
  pub force: bool,
  pub no_docker: bool,
}

/// Build (or reuse) the code package of a benchmark and print where it lives.
pub fn cmd_build(workspace: &Workspace, args: BuildArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let arch = match args.arch {
    Some(arch) => arch,
    None => Arch::current().context("Unsupported host architecture, pass --arch")?,
  };

  let cache = ArtifactCache::open(&workspace.cache)
    .with_context(|| format!("Failed to open cache at {}", workspace.cache.display()))?;
  let systems = SystemsConfig::load(&workspace.systems).context("Failed to load systems configuration")?;

  let request = BuildRequest::new(
    &args.deployment,
    &args.benchmark,
    args.language,
    &args.language_version,
    arch,
  )
  .with_force(args.force)
  .with_builder(!args.no_docker);

  let mut pipeline = BuildPipeline::new(&cache, &systems, workspace.build.clone());
  if !args.no_docker {
    pipeline = pipeline.with_runner(DockerCli::default());
  }

  let outcome = pipeline
    .build(&request, &ZipPackager)
    .with_context(|| format!("Failed to build {}", request.key()))?;
  cache.shutdown().context("Failed to write provider configuration")?;

  if output.is_json() {
    return print_json(&outcome);
  }
  print_build_outcome(&request, &outcome, start.elapsed());
  Ok(())
}
