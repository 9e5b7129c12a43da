//! Content hashing of benchmark sources.
//!
//! The digest covers exactly the files that end up shaping a package:
//!
//! 1. language sources and dependency manifests in `<benchmark>/<language>`
//! 2. non-language files (`*.sh`, `*.json`) in the same directory
//! 3. the deployment wrapper templates in `<wrappers>/<deployment>/<language>`
//!
//! Groups are hashed in that order, each pattern's matches sorted by path.
//! Files are hashed byte for byte, so line-ending differences between
//! checkouts change the digest.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::types::{Language, NON_LANGUAGE_PATTERNS};
use crate::util::fs::matching_files;
use crate::util::hash::{ContentHash, HashError, hash_files};

/// Computes the digest deciding whether a cached artifact is stale.
#[derive(Debug, Clone)]
pub struct ContentHasher {
  wrappers_dir: PathBuf,
}

impl ContentHasher {
  pub fn new(wrappers_dir: impl Into<PathBuf>) -> Self {
    Self {
      wrappers_dir: wrappers_dir.into(),
    }
  }

  /// Wrapper templates injected into every package of (deployment, language).
  pub fn wrapper_dir(&self, deployment: &str, language: Language) -> PathBuf {
    self.wrappers_dir.join(deployment).join(language.as_str())
  }

  /// Files contributing to the digest, in hashing order.
  ///
  /// A file matched by two patterns appears twice.
  pub fn tracked_files(&self, benchmark_dir: &Path, deployment: &str, language: Language) -> Result<Vec<PathBuf>, HashError> {
    let source_dir = benchmark_dir.join(language.as_str());
    let wrapper_dir = self.wrapper_dir(deployment, language);

    let source_globs = language
      .source_patterns()
      .iter()
      .chain(NON_LANGUAGE_PATTERNS)
      .map(|pattern| (source_dir.as_path(), *pattern));
    let wrapper_globs = std::iter::once((wrapper_dir.as_path(), language.wrapper_pattern()));

    let mut files = Vec::new();
    for (dir, pattern) in source_globs.chain(wrapper_globs) {
      files.extend(matching_files(dir, pattern)?);
    }
    Ok(files)
  }

  /// Hash of the sources of `benchmark_dir` for (deployment, language).
  pub fn hash(&self, benchmark_dir: &Path, deployment: &str, language: Language) -> Result<ContentHash, HashError> {
    let files = self.tracked_files(benchmark_dir, deployment, language)?;
    let hash = hash_files(&files)?;
    trace!(benchmark = %benchmark_dir.display(), files = files.len(), hash = %hash, "hashed sources");
    Ok(hash)
  }
}
