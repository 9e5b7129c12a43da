use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::platform::Arch;
use crate::types::{Language, ParseError};
use crate::util::fs::FsError;

/// Artifact flavor: a code archive/tree or a container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  CodePackage,
  Container,
}

impl ArtifactKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::CodePackage => "code_package",
      Self::Container => "container",
    }
  }

  /// Directory holding the payload below the identity key path.
  pub fn storage_dir(&self) -> &'static str {
    match self {
      Self::CodePackage => "package",
      Self::Container => "container",
    }
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ArtifactKind {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "code_package" | "package" => Ok(Self::CodePackage),
      "container" => Ok(Self::Container),
      other => Err(ParseError::ArtifactKind(other.to_string())),
    }
  }
}

/// Identity key of an artifact: (deployment, benchmark, language, version, arch, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
  pub deployment: String,
  pub benchmark: String,
  pub language: Language,
  pub language_version: String,
  pub arch: Arch,
  pub kind: ArtifactKind,
}

impl ArtifactKey {
  pub fn new(
    deployment: impl Into<String>,
    benchmark: impl Into<String>,
    language: Language,
    language_version: impl Into<String>,
    arch: Arch,
    kind: ArtifactKind,
  ) -> Self {
    Self {
      deployment: deployment.into(),
      benchmark: benchmark.into(),
      language,
      language_version: language_version.into(),
      arch,
      kind,
    }
  }

  /// Reject components that would escape their directory under the cache root.
  pub fn validate(&self) -> Result<(), CacheError> {
    check_name("deployment", &self.deployment)?;
    check_name("benchmark", &self.benchmark)?;
    check_name("language version", &self.language_version)
  }

  /// Key inside the `code_package`/`containers` map: `"<version>-<arch>"`.
  pub fn version_key(&self) -> String {
    format!("{}-{}", self.language_version, self.arch)
  }

  /// Payload directory relative to the cache root:
  /// `<benchmark>/<deployment>/<language>/<version>/<arch>/<package|container>`.
  pub fn storage_path(&self) -> PathBuf {
    PathBuf::from(&self.benchmark)
      .join(&self.deployment)
      .join(self.language.as_str())
      .join(&self.language_version)
      .join(self.arch.as_str())
      .join(self.kind.storage_dir())
  }
}

impl fmt::Display for ArtifactKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}/{}/{}/{}/{}",
      self.deployment,
      self.benchmark,
      self.language,
      self.version_key(),
      self.kind
    )
  }
}

/// Ensure `name` is a single, ordinary path component.
pub fn check_name(what: &'static str, name: &str) -> Result<(), CacheError> {
  let invalid = name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']);
  if invalid {
    return Err(CacheError::InvalidName {
      what,
      name: name.to_string(),
    });
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDates {
  pub created: DateTime<Utc>,
  pub modified: DateTime<Utc>,
}

/// A built, deployable unit of benchmark code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub hash: String,
  pub size: u64,
  /// Payload path relative to the cache root, `/`-separated.
  pub location: String,
  pub date: ArtifactDates,
  #[serde(rename = "image-uri", default, skip_serializing_if = "Option::is_none")]
  pub image_uri: Option<String>,
  #[serde(rename = "image-id", default, skip_serializing_if = "Option::is_none")]
  pub image_id: Option<String>,
}

/// Reference to a pushed container image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
  pub uri: String,
  pub id: String,
}

/// Caller-supplied description of a freshly built artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
  pub hash: String,
  pub size: u64,
  pub image: Option<ImageRef>,
}

/// Metadata for a function deployed to one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
  pub name: String,
  pub benchmark: String,
  pub language: Language,
  /// Hash of the code artifact this function was deployed from.
  pub code_package: String,
  #[serde(default)]
  pub triggers: Vec<Value>,
  #[serde(default)]
  pub config: Value,
}

/// Which cloud-side allocation a [`ResourceConfig`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
  Storage,
  Nosql,
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Storage => write!(f, "storage"),
      Self::Nosql => write!(f, "nosql"),
    }
  }
}

/// Identifiers of cloud objects already provisioned for a benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub input_prefixes: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub output_prefixes: Vec<String>,

  /// Set once benchmark input has been uploaded under `input_prefixes`.
  #[serde(default)]
  pub input_uploaded: bool,

  /// NoSQL table name by logical table.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub tables: BTreeMap<String, String>,

  /// Provider-specific fields kept verbatim.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Per-language section of a benchmark's cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
  #[serde(default)]
  pub code_package: BTreeMap<String, Artifact>,
  #[serde(default)]
  pub containers: BTreeMap<String, Artifact>,
  #[serde(default)]
  pub functions: BTreeMap<String, FunctionRecord>,
}

impl LanguageEntry {
  pub fn artifacts(&self, kind: ArtifactKind) -> &BTreeMap<String, Artifact> {
    match kind {
      ArtifactKind::CodePackage => &self.code_package,
      ArtifactKind::Container => &self.containers,
    }
  }

  pub fn artifacts_mut(&mut self, kind: ArtifactKind) -> &mut BTreeMap<String, Artifact> {
    match kind {
      ArtifactKind::CodePackage => &mut self.code_package,
      ArtifactKind::Container => &mut self.containers,
    }
  }

  /// Whether any code package or container is recorded.
  pub fn has_artifacts(&self) -> bool {
    !self.code_package.is_empty() || !self.containers.is_empty()
  }
}

/// Per-deployment section: languages plus deployment-wide resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub storage: Option<ResourceConfig>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nosql: Option<ResourceConfig>,

  #[serde(flatten)]
  pub languages: BTreeMap<String, LanguageEntry>,
}

impl DeploymentEntry {
  pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceConfig> {
    match kind {
      ResourceKind::Storage => self.storage.as_ref(),
      ResourceKind::Nosql => self.nosql.as_ref(),
    }
  }

  pub fn resource_mut(&mut self, kind: ResourceKind) -> &mut Option<ResourceConfig> {
    match kind {
      ResourceKind::Storage => &mut self.storage,
      ResourceKind::Nosql => &mut self.nosql,
    }
  }
}

/// Contents of `<cache>/<benchmark>/config.json`, keyed by deployment.
pub type BenchmarkIndex = BTreeMap<String, DeploymentEntry>;

#[derive(Debug, Error)]
pub enum CacheError {
  /// `add_artifact` on an identity key that already has a record.
  #[error("artifact already cached for {key}; use update_artifact to replace it")]
  AlreadyCached { key: String },

  /// A function was registered before its code artifact.
  #[error("cannot cache function {function}: no code artifact cached for {deployment}/{benchmark}/{language}")]
  MissingArtifact {
    deployment: String,
    benchmark: String,
    language: Language,
    function: String,
  },

  /// A name used as a path component under the cache root.
  #[error("invalid {what} name {name:?}")]
  InvalidName { what: &'static str, name: String },

  /// A cache file could not be parsed.
  #[error("corrupt cache file {path}: {source}")]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("artifact payload does not exist: {0}")]
  MissingPayload(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize cache entry: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error(transparent)]
  Fs(#[from] FsError),
}
