//! Default locations for the cache, benchmark sources and build staging.
//!
//! Each location can be overridden through an environment variable; the CLI
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use crate::consts::APP_NAME;

/// Overrides the cache root.
pub const CACHE_ENV: &str = "SEBS_CACHE";

/// Overrides the benchmark source tree.
pub const BENCHMARKS_ENV: &str = "SEBS_BENCHMARKS";

/// Overrides the deployment wrapper tree.
pub const WRAPPERS_ENV: &str = "SEBS_WRAPPERS";

/// Overrides the staging root used while building packages.
pub const BUILD_DIR_ENV: &str = "SEBS_BUILD_DIR";

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(std::env::temp_dir)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(std::env::temp_dir)
}

/// Returns the platform cache directory for the application
#[cfg(windows)]
fn platform_cache_dir() -> PathBuf {
  let local_appdata = env_path("LOCALAPPDATA").unwrap_or_else(home_dir);
  local_appdata.join(APP_NAME).join("Cache")
}

/// Returns the platform cache directory for the application
#[cfg(not(windows))]
fn platform_cache_dir() -> PathBuf {
  let cache_home = env_path("XDG_CACHE_HOME").unwrap_or_else(|| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Root of the artifact cache.
pub fn cache_dir() -> PathBuf {
  env_path(CACHE_ENV).unwrap_or_else(platform_cache_dir)
}

/// Root of the benchmark source tree.
pub fn benchmarks_dir() -> PathBuf {
  env_path(BENCHMARKS_ENV).unwrap_or_else(|| PathBuf::from("benchmarks"))
}

/// Root of the deployment wrapper tree (`<root>/<deployment>/<language>/`).
pub fn wrappers_dir() -> PathBuf {
  wrappers_dir_in(&benchmarks_dir())
}

/// Wrapper tree for an explicit benchmarks root, unless `SEBS_WRAPPERS` is set.
pub fn wrappers_dir_in(benchmarks: &Path) -> PathBuf {
  env_path(WRAPPERS_ENV).unwrap_or_else(|| benchmarks.join("wrappers"))
}

/// Root under which packages are staged before they enter the cache.
pub fn build_dir() -> PathBuf {
  build_dir_in(&cache_dir())
}

/// Staging root for an explicit cache root, unless `SEBS_BUILD_DIR` is set.
pub fn build_dir_in(cache: &Path) -> PathBuf {
  env_path(BUILD_DIR_ENV).unwrap_or_else(|| cache.join(".build"))
}
