//! Hashing utilities for cache validation.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hex digest
//! - `hash_files()`: Digest over the concatenated bytes of an ordered file list

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::fs::FsError;

/// A full 64-character SHA-256 hash of file contents.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Fs(#[from] FsError),
}

/// Hash the raw bytes of `paths`, concatenated in the order given.
///
/// File boundaries are not encoded: the caller fixes the order, so the same
/// file set with the same contents always yields the same digest.
pub fn hash_files<P: AsRef<Path>>(paths: &[P]) -> Result<ContentHash, HashError> {
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  for path in paths {
    let path = path.as_ref();
    let read_err = |source| HashError::ReadFile {
      path: path.to_path_buf(),
      source,
    };
    let mut file = fs::File::open(path).map_err(read_err)?;

    loop {
      let bytes_read = file.read(&mut buffer).map_err(read_err)?;
      if bytes_read == 0 {
        break;
      }
      hasher.update(&buffer[..bytes_read]);
    }
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}
