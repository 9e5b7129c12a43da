//! Core types for the build pipeline.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::benchmark::BenchmarkError;
use crate::cache::{ArtifactKey, ArtifactKind, CacheError, ImageRef};
use crate::platform::Arch;
use crate::types::Language;
use crate::util::fs::FsError;
use crate::util::hash::HashError;

/// What to build: one (deployment, benchmark, language, version, arch, kind) combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub deployment: String,
  pub benchmark: String,
  pub language: Language,
  pub language_version: String,
  pub arch: Arch,
  pub kind: ArtifactKind,
  /// Rebuild even when the cached artifact is still valid.
  pub force: bool,
  /// Install dependencies inside the builder container when one is configured.
  pub use_builder: bool,
}

impl BuildRequest {
  /// A code-package build using the builder container.
  pub fn new(
    deployment: impl Into<String>,
    benchmark: impl Into<String>,
    language: Language,
    language_version: impl Into<String>,
    arch: Arch,
  ) -> Self {
    Self {
      deployment: deployment.into(),
      benchmark: benchmark.into(),
      language,
      language_version: language_version.into(),
      arch,
      kind: ArtifactKind::CodePackage,
      force: false,
      use_builder: true,
    }
  }

  pub fn with_kind(mut self, kind: ArtifactKind) -> Self {
    self.kind = kind;
    self
  }

  pub fn with_force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }

  pub fn with_builder(mut self, use_builder: bool) -> Self {
    self.use_builder = use_builder;
    self
  }

  /// Identity key of the artifact this request produces.
  pub fn key(&self) -> ArtifactKey {
    ArtifactKey::new(
      &self.deployment,
      &self.benchmark,
      self.language,
      &self.language_version,
      self.arch,
      self.kind,
    )
  }
}

/// Everything a packager needs to know about a staged build.
#[derive(Debug, Clone, Copy)]
pub struct PackageContext<'a> {
  pub staged: &'a Path,
  pub benchmark: &'a str,
  pub language: Language,
  pub language_version: &'a str,
  pub arch: Arch,
  pub kind: ArtifactKind,
}

/// Result of packaging a staged tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
  /// Payload to register in the cache: an archive file or a directory tree.
  pub location: PathBuf,
  pub size: u64,
  /// Pushed image, for container builds.
  pub image: Option<ImageRef>,
}

/// Deployment-specific final packaging step.
///
/// Implemented for closures, so callers can pass
/// `|ctx: &PackageContext<'_>| { ... }` directly.
pub trait Packager {
  fn package(&self, ctx: &PackageContext<'_>) -> Result<PackageOutput, BuildError>;
}

impl<F> Packager for F
where
  F: Fn(&PackageContext<'_>) -> Result<PackageOutput, BuildError>,
{
  fn package(&self, ctx: &PackageContext<'_>) -> Result<PackageOutput, BuildError> {
    self(ctx)
  }
}

/// Result of [`BuildPipeline::build`](super::BuildPipeline::build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
  /// Whether staging and packaging ran.
  pub rebuilt: bool,
  /// Whether an artifact was cached before this build.
  pub is_cached: bool,
  /// Whether that cached artifact was still valid.
  pub is_cached_valid: bool,
  /// Absolute path of the cached payload.
  pub location: PathBuf,
  pub size: u64,
  pub hash: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<ImageRef>,
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Benchmark(#[from] BenchmarkError),

  #[error("benchmark {benchmark} has no {language} implementation")]
  UnsupportedLanguage { benchmark: String, language: Language },

  #[error("failed to hash benchmark sources: {0}")]
  Hash(#[from] HashError),

  #[error("failed to stage benchmark code: {0}")]
  Stage(#[from] FsError),

  #[error("invalid dependency manifest {path}: {source}")]
  Manifest {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("init script {script} failed with exit code {code:?}")]
  InitScript { script: PathBuf, code: Option<i32> },

  #[error("dependency installation in {image} failed with exit code {code:?}")]
  Install { image: String, code: Option<i32> },

  #[error("failed to package {path}: {message}")]
  Package { path: PathBuf, message: String },

  #[error("failed to record artifact: {0}")]
  Cache(#[from] CacheError),
}
