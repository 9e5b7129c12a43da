//! Deployment system configuration (`systems.json`).
//!
//! Describes, per deployment and language, which builder images exist, which
//! wrapper files are injected into every package and which extra dependencies
//! the deployment requires.
//!
//! # Format
//!
//! ```json
//! {
//!   "general": { "docker_repository": "spcleth/serverless-benchmarks" },
//!   "aws": {
//!     "languages": {
//!       "python": {
//!         "base_images": { "3.9": "amazon/aws-lambda-python:3.9" },
//!         "images": ["build"],
//!         "deployment": {
//!           "files": ["handler.py", "storage.py"],
//!           "packages": [],
//!           "module_packages": { "storage": ["boto3"] }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_DOCKER_REPOSITORY;
use crate::types::Language;

/// Image tag suffix marking a deployment/language pair as having a builder image.
const BUILD_IMAGE: &str = "build";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemsConfig {
  #[serde(default)]
  pub general: GeneralConfig,

  #[serde(flatten)]
  pub deployments: BTreeMap<String, DeploymentSystem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
  #[serde(default = "default_repository")]
  pub docker_repository: String,
}

fn default_repository() -> String {
  DEFAULT_DOCKER_REPOSITORY.to_string()
}

impl Default for GeneralConfig {
  fn default() -> Self {
    Self {
      docker_repository: default_repository(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSystem {
  #[serde(default)]
  pub languages: BTreeMap<String, LanguageSystem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageSystem {
  /// Supported language versions and their runtime base image.
  #[serde(default)]
  pub base_images: BTreeMap<String, String>,

  /// Image kinds published for this pair (e.g. `"build"`, `"run"`).
  #[serde(default)]
  pub images: Vec<String>,

  #[serde(default)]
  pub deployment: DeploymentFiles,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFiles {
  /// Wrapper files copied from `<wrappers>/<deployment>/<language>/`.
  #[serde(default)]
  pub files: Vec<String>,

  /// Dependencies every package for this deployment needs.
  #[serde(default)]
  pub packages: Packages,

  /// Dependencies required when a benchmark declares a module (`storage`, `nosql`).
  #[serde(default)]
  pub module_packages: BTreeMap<String, Packages>,
}

/// Dependency entries: a plain list (`["boto3"]`) or pinned versions
/// (`{"uuid": "3.4.0"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Packages {
  List(Vec<String>),
  Versioned(BTreeMap<String, String>),
}

impl Default for Packages {
  fn default() -> Self {
    Packages::List(Vec::new())
  }
}

impl Packages {
  /// `(name, version)` pairs in declaration order; unpinned entries have no version.
  pub fn entries(&self) -> Vec<(String, Option<String>)> {
    match self {
      Packages::List(names) => names.iter().map(|n| (n.clone(), None)).collect(),
      Packages::Versioned(map) => map.iter().map(|(n, v)| (n.clone(), Some(v.clone()))).collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    match self {
      Packages::List(names) => names.is_empty(),
      Packages::Versioned(map) => map.is_empty(),
    }
  }
}

impl SystemsConfig {
  /// Load the configuration from `path`.
  ///
  /// A missing file yields the empty configuration: no builder images and
  /// every wrapper file is injected.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn language(&self, deployment: &str, language: Language) -> Option<&LanguageSystem> {
    self.deployments.get(deployment)?.languages.get(language.as_str())
  }

  /// Builder image for this combination, if one is published.
  ///
  /// Format: `<repository>:build.<deployment>.<language>.<version>`.
  pub fn build_image(&self, deployment: &str, language: Language, version: &str) -> Option<String> {
    let system = self.language(deployment, language)?;
    if !system.images.iter().any(|i| i == BUILD_IMAGE) || !system.base_images.contains_key(version) {
      return None;
    }
    Some(format!(
      "{}:{}.{}.{}.{}",
      self.general.docker_repository, BUILD_IMAGE, deployment, language, version
    ))
  }

  /// Wrapper files to inject; empty means "every file matching the wrapper glob".
  pub fn deployment_files(&self, deployment: &str, language: Language) -> &[String] {
    self
      .language(deployment, language)
      .map(|s| s.deployment.files.as_slice())
      .unwrap_or(&[])
  }

  /// Deployment-wide dependencies followed by those of each declared module.
  pub fn deployment_packages(&self, deployment: &str, language: Language, modules: &[String]) -> Vec<(String, Option<String>)> {
    let Some(system) = self.language(deployment, language) else {
      return Vec::new();
    };

    let mut entries = system.deployment.packages.entries();
    for module in modules {
      if let Some(packages) = system.deployment.module_packages.get(module) {
        entries.extend(packages.entries());
      }
    }
    entries
  }
}
