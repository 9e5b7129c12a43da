mod build;
mod cache;
mod config;
mod prepare;

use std::path::PathBuf;

use sebs_lib::build::BuildPaths;
use sebs_lib::platform::paths;

pub use build::{BuildArgs, cmd_build};
pub use cache::{cmd_cache_list, cmd_cache_show};
pub use config::{cmd_config_get, cmd_config_set};
pub use prepare::{PrepareArgs, cmd_prepare};

/// Locations every command works against, after flags and environment are applied.
#[derive(Debug, Clone)]
pub struct Workspace {
  pub cache: PathBuf,
  pub systems: PathBuf,
  pub build: BuildPaths,
}

impl Workspace {
  /// Flags win over `SEBS_*` variables, which win over the defaults.
  pub fn resolve(
    cache: Option<PathBuf>,
    benchmarks: Option<PathBuf>,
    wrappers: Option<PathBuf>,
    systems: PathBuf,
  ) -> Self {
    let cache = cache.unwrap_or_else(paths::cache_dir);
    let benchmarks = benchmarks.unwrap_or_else(paths::benchmarks_dir);
    let wrappers = wrappers.unwrap_or_else(|| paths::wrappers_dir_in(&benchmarks));
    let build = paths::build_dir_in(&cache);

    Self {
      cache,
      systems,
      build: BuildPaths {
        benchmarks,
        wrappers,
        build,
      },
    }
  }
}
