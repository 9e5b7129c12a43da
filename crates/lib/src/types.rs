//! Identifiers shared by the cache, the build pipeline and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Files that are not language sources but still shape a package
/// (init scripts, benchmark and dependency configuration).
pub const NON_LANGUAGE_PATTERNS: &[&str] = &["*.sh", "*.json"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unsupported language: {0}")]
  Language(String),

  #[error("unsupported architecture: {0}")]
  Arch(String),

  #[error("unknown input size: {0}")]
  InputSize(String),

  #[error("unknown artifact kind: {0}")]
  ArtifactKind(String),
}

/// Runtime language of a benchmark implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  Python,
  Nodejs,
}

impl Language {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Python => "python",
      Self::Nodejs => "nodejs",
    }
  }

  /// Globs selecting the sources and dependency manifests of a benchmark.
  pub fn source_patterns(&self) -> &'static [&'static str] {
    match self {
      Self::Python => &["*.py", "requirements.txt*"],
      Self::Nodejs => &["*.js", "package.json"],
    }
  }

  /// Glob selecting the deployment wrapper templates for this language.
  pub fn wrapper_pattern(&self) -> &'static str {
    match self {
      Self::Python => "*.py",
      Self::Nodejs => "*.js",
    }
  }

  /// File the dependency installer reads inside a staged package.
  pub fn dependency_manifest(&self) -> &'static str {
    match self {
      Self::Python => "requirements.txt",
      Self::Nodejs => "package.json",
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Language {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "python" => Ok(Self::Python),
      "nodejs" => Ok(Self::Nodejs),
      other => Err(ParseError::Language(other.to_string())),
    }
  }
}

/// Size class of generated benchmark input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSize {
  Test,
  Small,
  Large,
}

impl InputSize {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Test => "test",
      Self::Small => "small",
      Self::Large => "large",
    }
  }
}

impl fmt::Display for InputSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for InputSize {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "test" => Ok(Self::Test),
      "small" => Ok(Self::Small),
      "large" => Ok(Self::Large),
      other => Err(ParseError::InputSize(other.to_string())),
    }
  }
}
