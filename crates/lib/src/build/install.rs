//! Dependency installation inside a builder container.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::types::{BuildError, BuildRequest};
use crate::consts::{CONTAINER_MOUNT_DIR, INSTALLER_SCRIPT};

/// Runs an installer image against a mounted package tree.
pub trait BuilderContainerRunner: Send + Sync {
  /// Run `image` with `mount_dir` mounted read-write and return its output.
  fn run(&self, image: &str, mount_dir: &Path, env: &BTreeMap<String, String>) -> Result<String, BuildError>;
}

/// Runner shelling out to the `docker` CLI.
///
/// Containers are started with `--rm` and removed when the installer exits.
#[derive(Debug, Clone)]
pub struct DockerCli {
  program: PathBuf,
}

impl Default for DockerCli {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerCli {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self { program: program.into() }
  }

  /// Arguments passed to the CLI for one installer run.
  pub fn args(image: &str, mount_dir: &Path, env: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = vec![
      "run".to_string(),
      "--rm".to_string(),
      "-v".to_string(),
      format!("{}:{}", mount_dir.display(), CONTAINER_MOUNT_DIR),
    ];
    for (key, value) in env {
      args.push("-e".to_string());
      args.push(format!("{}={}", key, value));
    }
    args.push(image.to_string());
    args.push("/bin/bash".to_string());
    args.push(INSTALLER_SCRIPT.to_string());
    args
  }
}

impl BuilderContainerRunner for DockerCli {
  fn run(&self, image: &str, mount_dir: &Path, env: &BTreeMap<String, String>) -> Result<String, BuildError> {
    let args = Self::args(image, mount_dir, env);
    debug!(program = %self.program.display(), args = ?args, "starting builder container");

    let output = Command::new(&self.program)
      .args(&args)
      .output()
      .map_err(|source| BuildError::Spawn {
        program: self.program.display().to_string(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "installer stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "installer stdout");
      }
      return Err(BuildError::Install {
        image: image.to_string(),
        code: output.status.code(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Environment passed to the installer script.
pub fn installer_env(request: &BuildRequest, staged: &Path) -> BTreeMap<String, String> {
  let (uid, gid) = owner_ids(staged);
  BTreeMap::from([
    ("APP".to_string(), request.benchmark.clone()),
    ("PLATFORM".to_string(), request.deployment.to_uppercase()),
    ("TARGET_ARCHITECTURE".to_string(), request.arch.to_string()),
    ("CONTAINER_UID".to_string(), uid.to_string()),
    ("CONTAINER_GID".to_string(), gid.to_string()),
    ("CONTAINER_USER".to_string(), "docker_user".to_string()),
  ])
}

/// Owner of the staged tree, so installed files keep the caller's ownership.
#[cfg(unix)]
fn owner_ids(path: &Path) -> (u32, u32) {
  use std::os::unix::fs::MetadataExt;
  std::fs::metadata(path).map(|m| (m.uid(), m.gid())).unwrap_or((0, 0))
}

#[cfg(not(unix))]
fn owner_ids(_path: &Path) -> (u32, u32) {
  (0, 0)
}

/// Whether the staged tree declares dependencies to install.
fn has_manifest(request: &BuildRequest, staged: &Path) -> bool {
  let manifest = request.language.dependency_manifest();
  staged.join(manifest).is_file() || staged.join(format!("{}.{}", manifest, request.language_version)).is_file()
}

/// Install dependencies of the staged tree through the builder image.
///
/// Skipped (returning `false`) when no image is configured for the
/// combination, no runner is available, or the tree has no manifest.
pub fn install_dependencies(
  runner: Option<&dyn BuilderContainerRunner>,
  image: Option<&str>,
  request: &BuildRequest,
  staged: &Path,
) -> Result<bool, BuildError> {
  let Some(image) = image else {
    info!(
      deployment = %request.deployment,
      language = %request.language,
      version = %request.language_version,
      "no builder image, skipping dependency installation"
    );
    return Ok(false);
  };
  let Some(runner) = runner else {
    info!(image, "no container runner, skipping dependency installation");
    return Ok(false);
  };
  if !has_manifest(request, staged) {
    debug!(staged = %staged.display(), "no dependency manifest, nothing to install");
    return Ok(false);
  }

  info!(image, benchmark = %request.benchmark, "installing dependencies in builder container");
  let env = installer_env(request, staged);
  let output = runner.run(image, staged, &env)?;
  if !output.is_empty() {
    debug!(output = %output, "installer output");
  }
  Ok(true)
}
