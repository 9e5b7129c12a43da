//! The build state machine: reuse a valid cached artifact or rebuild it.

use std::path::PathBuf;

use tracing::{debug, info};

use super::hash::ContentHasher;
use super::install::{BuilderContainerRunner, install_dependencies};
use super::stage::{copy_sources, inject_packages, inject_wrappers, run_init_scripts};
use super::types::{BuildError, BuildOutcome, BuildRequest, PackageContext, Packager};
use crate::benchmark::Benchmark;
use crate::cache::{Artifact, ArtifactCache, ArtifactMetadata, ImageRef};
use crate::config::SystemsConfig;
use crate::platform::paths;
use crate::util::fs::{create_dir_all, remove_path};

/// Source, wrapper and staging roots used by a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
  pub benchmarks: PathBuf,
  pub wrappers: PathBuf,
  pub build: PathBuf,
}

impl BuildPaths {
  /// Roots from `SEBS_BENCHMARKS`, `SEBS_WRAPPERS` and `SEBS_BUILD_DIR`, or their defaults.
  pub fn from_env() -> Self {
    Self {
      benchmarks: paths::benchmarks_dir(),
      wrappers: paths::wrappers_dir(),
      build: paths::build_dir(),
    }
  }
}

/// Produces deployable artifacts, consulting the cache first.
pub struct BuildPipeline<'a> {
  cache: &'a ArtifactCache,
  systems: &'a SystemsConfig,
  hasher: ContentHasher,
  paths: BuildPaths,
  runner: Option<Box<dyn BuilderContainerRunner>>,
}

impl<'a> BuildPipeline<'a> {
  /// A pipeline without a container runner: dependencies are not installed.
  pub fn new(cache: &'a ArtifactCache, systems: &'a SystemsConfig, paths: BuildPaths) -> Self {
    Self {
      cache,
      systems,
      hasher: ContentHasher::new(&paths.wrappers),
      paths,
      runner: None,
    }
  }

  pub fn with_runner(mut self, runner: impl BuilderContainerRunner + 'static) -> Self {
    self.runner = Some(Box::new(runner));
    self
  }

  pub fn hasher(&self) -> &ContentHasher {
    &self.hasher
  }

  /// Staging directory of a request:
  /// `<build>/<benchmark>_code/<language>/<version>/<arch>/<package|container>`.
  pub fn staging_dir(&self, request: &BuildRequest) -> PathBuf {
    self
      .paths
      .build
      .join(format!("{}_code", request.benchmark))
      .join(request.language.as_str())
      .join(&request.language_version)
      .join(request.arch.as_str())
      .join(request.kind.storage_dir())
  }

  /// Return the cached artifact for `request` if its sources are unchanged,
  /// otherwise stage, install and package the benchmark and record the result.
  ///
  /// Any failure before the result is recorded leaves the cache untouched. The
  /// staging directory of a failed attempt is kept until the next build.
  pub fn build(&self, request: &BuildRequest, packager: &dyn Packager) -> Result<BuildOutcome, BuildError> {
    let benchmark = Benchmark::find(&self.paths.benchmarks, &request.benchmark)?;
    if !benchmark.supports(request.language) {
      return Err(BuildError::UnsupportedLanguage {
        benchmark: benchmark.name,
        language: request.language,
      });
    }

    let key = request.key();
    let cached = self.cache.get_artifact(&key);
    let hash = self.hasher.hash(&benchmark.path, &request.deployment, request.language)?.0;
    let is_cached_valid = cached.as_ref().is_some_and(|a| a.hash == hash);

    if let Some(artifact) = &cached {
      if is_cached_valid && !request.force {
        info!(key = %key, hash = %hash, "using cached artifact");
        return Ok(self.outcome(artifact, false, true, true));
      }
    }

    match &cached {
      None => info!(key = %key, "no cached artifact, building"),
      Some(_) if is_cached_valid => info!(key = %key, "rebuild forced"),
      Some(artifact) => info!(key = %key, cached = %artifact.hash, current = %hash, "sources changed, rebuilding"),
    }

    let staged = self.stage(&benchmark, request)?;

    let ctx = PackageContext {
      staged: &staged,
      benchmark: &request.benchmark,
      language: request.language,
      language_version: &request.language_version,
      arch: request.arch,
      kind: request.kind,
    };
    let output = packager.package(&ctx)?;

    let meta = ArtifactMetadata {
      hash,
      size: output.size,
      image: output.image,
    };
    let artifact = match cached {
      Some(_) => self.cache.update_artifact(&key, &output.location, meta)?,
      None => self.cache.add_artifact(&key, &output.location, meta)?,
    };

    Ok(self.outcome(&artifact, true, cached.is_some(), is_cached_valid))
  }

  /// Assemble a fresh staging directory for `request`.
  fn stage(&self, benchmark: &Benchmark, request: &BuildRequest) -> Result<PathBuf, BuildError> {
    let staged = self.staging_dir(request);
    remove_path(&staged)?;
    create_dir_all(&staged)?;
    debug!(staged = %staged.display(), "staging directory prepared");

    let language = request.language;
    copy_sources(benchmark, language, &request.language_version, &staged)?;
    run_init_scripts(benchmark, language, &staged, request.arch)?;

    let files = self.systems.deployment_files(&request.deployment, language);
    inject_wrappers(&self.hasher.wrapper_dir(&request.deployment, language), files, language, &staged)?;

    let packages = self
      .systems
      .deployment_packages(&request.deployment, language, &benchmark.config.modules);
    inject_packages(language, &request.language_version, &staged, &packages)?;

    let runner = if request.use_builder { self.runner.as_deref() } else { None };
    let image = self
      .systems
      .build_image(&request.deployment, language, &request.language_version);
    install_dependencies(runner, image.as_deref(), request, &staged)?;

    Ok(staged)
  }

  fn outcome(&self, artifact: &Artifact, rebuilt: bool, is_cached: bool, is_cached_valid: bool) -> BuildOutcome {
    let image = match (&artifact.image_uri, &artifact.image_id) {
      (Some(uri), Some(id)) => Some(ImageRef {
        uri: uri.clone(),
        id: id.clone(),
      }),
      _ => None,
    };

    BuildOutcome {
      rebuilt,
      is_cached,
      is_cached_valid,
      location: self.cache.resolve(artifact),
      size: artifact.size,
      hash: artifact.hash.clone(),
      image,
    }
  }
}
