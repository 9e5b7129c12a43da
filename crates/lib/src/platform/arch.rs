use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ParseError;

/// CPU architecture a function package is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X64,
  Arm64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X64),
      "aarch64" => Some(Self::Arm64),
      _ => None,
    }
  }

  /// Returns the identifier used in cache keys and builder environments
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::Arm64 => "arm64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "x64" | "x86_64" | "amd64" => Ok(Self::X64),
      "arm64" | "aarch64" => Ok(Self::Arm64),
      other => Err(ParseError::Arch(other.to_string())),
    }
  }
}
