//! File-system helpers for staging packages and storing payloads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FsError {
  #[error("invalid glob pattern {pattern}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk directory {path}: {message}")]
  Walk { path: PathBuf, message: String },
}

/// Files in `dir` (not recursive) matching `pattern`, sorted by path.
///
/// A missing directory yields no matches.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
  let escaped = PathBuf::from(glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
  let full_pattern = escaped.to_string_lossy().to_string();

  let paths = glob::glob(&full_pattern).map_err(|source| FsError::Pattern {
    pattern: full_pattern.clone(),
    source,
  })?;

  let mut files = Vec::new();
  for entry in paths {
    let path = entry.map_err(|e| FsError::Read {
      path: e.path().to_path_buf(),
      source: e.into_error(),
    })?;
    if path.is_file() {
      files.push(path);
    }
  }

  files.sort();
  Ok(files)
}

pub fn create_dir_all(path: &Path) -> Result<(), FsError> {
  fs::create_dir_all(path).map_err(|source| FsError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}

/// Copy `file` into `dir`, keeping its file name. Returns the new path.
pub fn copy_into(file: &Path, dir: &Path) -> Result<PathBuf, FsError> {
  let name = file.file_name().ok_or_else(|| FsError::Copy {
    from: file.to_path_buf(),
    to: dir.to_path_buf(),
    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
  })?;
  let dest = dir.join(name);
  copy_file(file, &dest)?;
  Ok(dest)
}

pub fn copy_file(from: &Path, to: &Path) -> Result<(), FsError> {
  fs::copy(from, to).map(|_| ()).map_err(|source| FsError::Copy {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })
}

/// Copy a directory recursively. Symlinks are followed.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), FsError> {
  create_dir_all(dst)?;

  for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
    let entry = entry.map_err(|e| FsError::Walk {
      path: src.to_path_buf(),
      message: e.to_string(),
    })?;
    let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(rel);

    if entry.file_type().is_dir() {
      create_dir_all(&target)?;
    } else {
      copy_file(entry.path(), &target)?;
    }
  }

  Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<(), FsError> {
  let result = match fs::symlink_metadata(path) {
    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => Err(e),
  };

  result.map_err(|source| FsError::Remove {
    path: path.to_path_buf(),
    source,
  })
}

/// Total size in bytes of a file, or of every file below a directory.
pub fn path_size(path: &Path) -> u64 {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .map(|m| m.len())
    .sum()
}
