//! On-disk persistence for the artifact cache.
//!
//! # Storage Layout
//!
//! ```text
//! {cache_root}/
//! ├── <deployment>.json                 # ProviderConfig
//! └── <benchmark>/
//!     ├── config.json                   # BenchmarkIndex
//!     └── <deployment>/<language>/<version>/<arch>/<package|container>/
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tracing::{debug, error};

use super::types::CacheError;
use crate::util::fs::{copy_dir_all, copy_into, create_dir_all};

/// Read a JSON file.
///
/// Returns `T::default()` if the file doesn't exist and
/// [`CacheError::Corrupt`] if it doesn't parse.
pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, CacheError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
    Err(source) => {
      return Err(CacheError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
    path: path.to_path_buf(),
    source,
  })
}

/// Read a JSON file, resetting it to empty when it is corrupt.
///
/// The corrupt file is left on disk; the next write replaces it.
pub(crate) fn read_json_or_reset<T: DeserializeOwned + Default>(path: &Path) -> T {
  match read_json(path) {
    Ok(value) => value,
    Err(e) => {
      error!(path = %path.display(), error = %e, "cache section unreadable, treating it as empty");
      T::default()
    }
  }
}

/// Write pretty-printed JSON atomically (write to temp, then rename).
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
  if let Some(parent) = path.parent() {
    create_dir_all(parent)?;
  }

  let content = serde_json::to_string_pretty(value).map_err(CacheError::Serialize)?;
  let temp_path = path.with_extension("json.tmp");
  let write_err = |source| CacheError::Write {
    path: path.to_path_buf(),
    source,
  };

  fs::write(&temp_path, content).map_err(write_err)?;
  fs::rename(&temp_path, path).map_err(write_err)?;
  debug!(path = %path.display(), "cache file written");
  Ok(())
}

/// Copy `source` (a directory tree or a single file) into `dest`.
///
/// The payload is assembled in a sibling temporary directory and swapped in
/// only once the copy succeeded, so an existing payload survives a failed
/// copy. Returns the payload path: `dest` for a tree, `dest/<file name>` for a
/// file.
pub(crate) fn install_payload(source: &Path, dest: &Path) -> Result<PathBuf, CacheError> {
  if !source.exists() {
    return Err(CacheError::MissingPayload(source.to_path_buf()));
  }

  let parent = dest.parent().unwrap_or(dest);
  create_dir_all(parent)?;

  let write_err = |source| CacheError::Write {
    path: dest.to_path_buf(),
    source,
  };

  let staging = tempfile::Builder::new()
    .prefix(".payload-")
    .tempdir_in(parent)
    .map_err(write_err)?;

  let payload = if source.is_dir() {
    copy_dir_all(source, staging.path())?;
    dest.to_path_buf()
  } else {
    let copied = copy_into(source, staging.path())?;
    dest.join(copied.file_name().unwrap_or_default())
  };

  let trash = tempfile::Builder::new()
    .prefix(".replaced-")
    .tempdir_in(parent)
    .map_err(write_err)?;
  swap_payload(staging.path(), dest, trash, |from, to| fs::rename(from, to)).map_err(write_err)?;

  Ok(payload)
}

/// Move `staged` into `dest`, parking any previous payload in `trash`.
///
/// Dropping `trash` removes the previous payload once the new one is in
/// place. If the swap fails and the previous payload cannot be moved back,
/// `trash` is kept on disk so the payload is not lost.
fn swap_payload(
  staged: &Path,
  dest: &Path,
  trash: TempDir,
  rename: impl Fn(&Path, &Path) -> io::Result<()>,
) -> io::Result<()> {
  let previous = trash.path().join("payload");
  let had_previous = dest.exists();

  if had_previous {
    rename(dest, &previous)?;
  }

  if let Err(e) = rename(staged, dest) {
    if had_previous && let Err(restore) = rename(&previous, dest) {
      let kept = trash.keep();
      error!(
        dest = %dest.display(),
        previous = %kept.join("payload").display(),
        error = %restore,
        "could not restore previous payload, keeping it"
      );
    }
    return Err(e);
  }

  Ok(())
}

/// Render `path` relative to `root` with `/` separators.
pub(crate) fn relative_location(root: &Path, path: &Path) -> String {
  let rel = path.strip_prefix(root).unwrap_or(path);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
