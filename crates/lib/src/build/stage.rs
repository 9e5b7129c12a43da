//! Staging: assemble the package tree before dependency installation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::types::BuildError;
use crate::benchmark::Benchmark;
use crate::consts::INIT_SCRIPT;
use crate::platform::Arch;
use crate::types::Language;
use crate::util::fs::{copy_file, copy_into, matching_files};

/// Copy the language sources of `benchmark` into `staged`.
///
/// A `package.json.<version>` next to the nodejs sources replaces
/// `package.json` for that runtime version. Returns the number of files copied.
pub fn copy_sources(benchmark: &Benchmark, language: Language, version: &str, staged: &Path) -> Result<usize, BuildError> {
  let source_dir = benchmark.language_dir(language);
  let mut copied = 0;

  for pattern in language.source_patterns() {
    for file in matching_files(&source_dir, pattern)? {
      copy_into(&file, staged)?;
      copied += 1;
    }
  }

  if language == Language::Nodejs {
    let versioned = source_dir.join(format!("package.json.{}", version));
    if versioned.is_file() {
      debug!(version, "using version-specific package.json");
      copy_file(&versioned, &staged.join("package.json"))?;
    }
  }

  debug!(benchmark = %benchmark.name, files = copied, "sources staged");
  Ok(copied)
}

/// Run `init.sh` from the benchmark root and from the language directory, if present.
///
/// Each script is called as `init.sh <staged> false <arch>` and may add
/// benchmark data to the staged tree. Returns the scripts that ran.
pub fn run_init_scripts(benchmark: &Benchmark, language: Language, staged: &Path, arch: Arch) -> Result<Vec<PathBuf>, BuildError> {
  let mut ran = Vec::new();

  for dir in [benchmark.path.clone(), benchmark.language_dir(language)] {
    let script = dir.join(INIT_SCRIPT);
    if !script.is_file() {
      continue;
    }

    info!(script = %script.display(), "running init script");
    let output = Command::new("/bin/bash")
      .arg(&script)
      .arg(staged)
      .arg("false")
      .arg(arch.as_str())
      .current_dir(&dir)
      .output()
      .map_err(|source| BuildError::Spawn {
        program: script.display().to_string(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "init script stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "init script stdout");
      }
      return Err(BuildError::InitScript {
        script,
        code: output.status.code(),
      });
    }

    ran.push(script);
  }

  Ok(ran)
}

/// Copy deployment wrapper templates into `staged`.
///
/// `files` names the templates to inject; when empty, every file in
/// `wrapper_dir` matching the language's wrapper glob is injected.
pub fn inject_wrappers(wrapper_dir: &Path, files: &[String], language: Language, staged: &Path) -> Result<usize, BuildError> {
  let sources = if files.is_empty() {
    matching_files(wrapper_dir, language.wrapper_pattern())?
  } else {
    files.iter().map(|f| wrapper_dir.join(f)).collect()
  };

  for file in &sources {
    copy_into(file, staged)?;
  }

  debug!(dir = %wrapper_dir.display(), files = sources.len(), "wrappers injected");
  Ok(sources.len())
}

/// Add deployment-required dependencies to the staged manifest.
///
/// Python entries are appended to `requirements.txt.<version>` if present,
/// else `requirements.txt`. Nodejs entries are merged into the `dependencies`
/// of `package.json`. A manifest is created when missing.
pub fn inject_packages(
  language: Language,
  version: &str,
  staged: &Path,
  packages: &[(String, Option<String>)],
) -> Result<(), BuildError> {
  if packages.is_empty() {
    return Ok(());
  }

  match language {
    Language::Python => append_requirements(version, staged, packages),
    Language::Nodejs => merge_package_json(staged, packages),
  }?;

  debug!(language = %language, packages = packages.len(), "deployment packages injected");
  Ok(())
}

fn append_requirements(version: &str, staged: &Path, packages: &[(String, Option<String>)]) -> Result<(), BuildError> {
  let versioned = staged.join(format!("requirements.txt.{}", version));
  let path = if versioned.is_file() {
    versioned
  } else {
    staged.join("requirements.txt")
  };

  let write_err = |source| BuildError::Write {
    path: path.clone(),
    source,
  };

  let needs_newline = match fs::read(&path) {
    Ok(content) => content.last().is_some_and(|b| *b != b'\n'),
    Err(e) if e.kind() == io::ErrorKind::NotFound => false,
    Err(e) => return Err(write_err(e)),
  };

  let mut lines = String::new();
  if needs_newline {
    lines.push('\n');
  }
  for (name, version) in packages {
    match version {
      Some(v) => lines.push_str(&format!("{}=={}\n", name, v)),
      None => lines.push_str(&format!("{}\n", name)),
    }
  }

  let mut file = fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(&path)
    .map_err(write_err)?;
  file.write_all(lines.as_bytes()).map_err(write_err)
}

fn merge_package_json(staged: &Path, packages: &[(String, Option<String>)]) -> Result<(), BuildError> {
  let path = staged.join("package.json");
  let write_err = |source| BuildError::Write {
    path: path.clone(),
    source,
  };

  let mut manifest: Value = match fs::read_to_string(&path) {
    Ok(content) => serde_json::from_str(&content).map_err(|source| BuildError::Manifest {
      path: path.clone(),
      source,
    })?,
    Err(e) if e.kind() == io::ErrorKind::NotFound => Value::Object(Map::new()),
    Err(e) => return Err(write_err(e)),
  };

  let Some(root) = manifest.as_object_mut() else {
    return Err(BuildError::Manifest {
      path: path.clone(),
      source: serde::de::Error::custom("package.json is not an object"),
    });
  };

  let dependencies = root
    .entry("dependencies")
    .or_insert_with(|| Value::Object(Map::new()));
  if !dependencies.is_object() {
    *dependencies = Value::Object(Map::new());
  }
  if let Some(deps) = dependencies.as_object_mut() {
    for (name, version) in packages {
      let version = version.clone().unwrap_or_else(|| "*".to_string());
      deps.insert(name.clone(), Value::String(version));
    }
  }

  let content = serde_json::to_string_pretty(&manifest).map_err(|source| BuildError::Manifest {
    path: path.clone(),
    source,
  })?;
  fs::write(&path, content).map_err(write_err)
}
