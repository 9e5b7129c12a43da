//! Persistent artifact cache.
//!
//! The cache records, per benchmark, the code packages and container images
//! built for every deployment/language/version/architecture, the functions
//! deployed from them and the cloud resources provisioned for the benchmark.
//! Provider configuration (credentials, allocated infrastructure) lives next
//! to it, one file per deployment.
//!
//! All state is mirrored in memory and guarded by a single mutex per cache
//! instance. Every mutation writes the affected file through and only then
//! updates the mirror, before the lock is released. Nothing guards the directory against
//! a second process using it concurrently.
//!
//! # Submodules
//!
//! - [`provider`] - Deep-merge helpers for provider configuration
//! - `store` - JSON and payload persistence

pub mod provider;
mod store;
mod types;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::consts::CONFIG_FILENAME;
use crate::types::Language;
use crate::util::fs::{create_dir_all, remove_path};

pub use types::*;

/// Durable store for artifacts, deployed functions, resources and provider configuration.
pub struct ArtifactCache {
  root: PathBuf,
  state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
  /// Provider configuration by deployment, loaded once at open.
  providers: BTreeMap<String, Value>,
  /// Benchmark cache files loaded so far.
  benchmarks: HashMap<String, BenchmarkIndex>,
  /// Provider configuration changed since the last flush.
  dirty: bool,
}

impl CacheState {
  /// The mirror of a benchmark's cache file, loading it on first use.
  fn index(&mut self, root: &Path, benchmark: &str) -> &mut BenchmarkIndex {
    self
      .benchmarks
      .entry(benchmark.to_string())
      .or_insert_with(|| store::read_json_or_reset(&benchmark_file(root, benchmark)))
  }

  /// Write `index` as the benchmark's cache file, then adopt it as the mirror.
  ///
  /// The mirror is left untouched when the write fails.
  fn commit(&mut self, root: &Path, benchmark: &str, index: BenchmarkIndex) -> Result<(), CacheError> {
    store::write_json(&benchmark_file(root, benchmark), &index)?;
    self.benchmarks.insert(benchmark.to_string(), index);
    Ok(())
  }

  fn lookup_artifact(&mut self, root: &Path, key: &ArtifactKey) -> Option<&Artifact> {
    self
      .index(root, &key.benchmark)
      .get(&key.deployment)?
      .languages
      .get(key.language.as_str())?
      .artifacts(key.kind)
      .get(&key.version_key())
  }

  fn record_artifact(&mut self, root: &Path, key: &ArtifactKey, artifact: &Artifact) -> Result<(), CacheError> {
    let mut index = self.index(root, &key.benchmark).clone();
    language_entry(&mut index, &key.deployment, key.language)
      .artifacts_mut(key.kind)
      .insert(key.version_key(), artifact.clone());
    self.commit(root, &key.benchmark, index)
  }

  fn add_artifact(&mut self, root: &Path, key: &ArtifactKey, source: &Path, meta: ArtifactMetadata) -> Result<Artifact, CacheError> {
    key.validate()?;
    if self.lookup_artifact(root, key).is_some() {
      return Err(CacheError::AlreadyCached { key: key.to_string() });
    }

    let dest = root.join(key.storage_path());
    if dest.exists() {
      warn!(key = %key, path = %dest.display(), "replacing orphaned artifact payload");
      remove_path(&dest)?;
    }

    let payload = store::install_payload(source, &dest)?;
    let now = Utc::now();
    let artifact = Artifact {
      hash: meta.hash,
      size: meta.size,
      location: store::relative_location(root, &payload),
      date: ArtifactDates {
        created: now,
        modified: now,
      },
      image_uri: meta.image.as_ref().map(|i| i.uri.clone()),
      image_id: meta.image.map(|i| i.id),
    };

    self.record_artifact(root, key, &artifact)?;
    info!(key = %key, hash = %artifact.hash, size = artifact.size, "artifact cached");
    Ok(artifact)
  }

  fn update_artifact(&mut self, root: &Path, key: &ArtifactKey, source: &Path, meta: ArtifactMetadata) -> Result<Artifact, CacheError> {
    key.validate()?;
    let dest = root.join(key.storage_path());
    let previous = self.lookup_artifact(root, key).cloned();

    if !dest.exists() && previous.is_none() {
      debug!(key = %key, "no cached payload, adding instead of updating");
      return self.add_artifact(root, key, source, meta);
    }

    let payload = store::install_payload(source, &dest)?;
    let now = Utc::now();
    let artifact = Artifact {
      hash: meta.hash,
      size: meta.size,
      location: store::relative_location(root, &payload),
      date: ArtifactDates {
        created: previous.map(|p| p.date.created).unwrap_or(now),
        modified: now,
      },
      image_uri: meta.image.as_ref().map(|i| i.uri.clone()),
      image_id: meta.image.map(|i| i.id),
    };

    self.record_artifact(root, key, &artifact)?;
    info!(key = %key, hash = %artifact.hash, size = artifact.size, "artifact updated");
    Ok(artifact)
  }
}

fn language_entry<'a>(index: &'a mut BenchmarkIndex, deployment: &str, language: Language) -> &'a mut LanguageEntry {
  index
    .entry(deployment.to_string())
    .or_default()
    .languages
    .entry(language.as_str().to_string())
    .or_default()
}

fn benchmark_file(root: &Path, benchmark: &str) -> PathBuf {
  root.join(benchmark).join(CONFIG_FILENAME)
}

fn provider_file(root: &Path, deployment: &str) -> PathBuf {
  root.join(format!("{}.json", deployment))
}

impl ArtifactCache {
  /// Open (creating if needed) the cache rooted at `root`.
  ///
  /// Every `<deployment>.json` directly under the root is loaded as provider
  /// configuration. Benchmark files are read lazily.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
    let root = root.into();
    create_dir_all(&root)?;
    let root = dunce::canonicalize(&root).unwrap_or(root);

    let mut providers = BTreeMap::new();
    let entries = fs::read_dir(&root).map_err(|source| CacheError::Read {
      path: root.clone(),
      source,
    })?;

    for entry in entries.filter_map(|e| e.ok()) {
      let path = entry.path();
      if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
        continue;
      }
      let Some(deployment) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
        continue;
      };
      let config: Value = store::read_json_or_reset(&path);
      if !config.is_null() {
        debug!(deployment = %deployment, "loaded provider config");
        providers.insert(deployment, config);
      }
    }

    Ok(Self {
      root,
      state: Mutex::new(CacheState {
        providers,
        ..CacheState::default()
      }),
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Absolute path of an artifact's payload.
  pub fn resolve(&self, artifact: &Artifact) -> PathBuf {
    self.root.join(&artifact.location)
  }

  fn state(&self) -> MutexGuard<'_, CacheState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // === Artifacts ===

  pub fn get_artifact(&self, key: &ArtifactKey) -> Option<Artifact> {
    key.validate().ok()?;
    self.state().lookup_artifact(&self.root, key).cloned()
  }

  /// Copy the payload at `source` into the cache and record a new artifact.
  ///
  /// Fails with [`CacheError::AlreadyCached`] if the identity key already has
  /// a record; use [`update_artifact`](Self::update_artifact) to replace one.
  pub fn add_artifact(&self, key: &ArtifactKey, source: &Path, meta: ArtifactMetadata) -> Result<Artifact, CacheError> {
    self.state().add_artifact(&self.root, key, source, meta)
  }

  /// Replace the payload and refresh `hash`, `size`, `location` and `modified`,
  /// keeping `created`.
  ///
  /// Behaves like [`add_artifact`](Self::add_artifact) when nothing is cached
  /// under the key yet.
  pub fn update_artifact(&self, key: &ArtifactKey, source: &Path, meta: ArtifactMetadata) -> Result<Artifact, CacheError> {
    self.state().update_artifact(&self.root, key, source, meta)
  }

  // === Functions ===

  pub fn get_functions(&self, deployment: &str, benchmark: &str, language: Language) -> BTreeMap<String, FunctionRecord> {
    if check_name("benchmark", benchmark).is_err() {
      return BTreeMap::new();
    }
    let mut state = self.state();
    state
      .index(&self.root, benchmark)
      .get(deployment)
      .and_then(|d| d.languages.get(language.as_str()))
      .map(|l| l.functions.clone())
      .unwrap_or_default()
  }

  /// Record a deployed function.
  ///
  /// Fails with [`CacheError::MissingArtifact`] unless a code package or
  /// container is cached for (deployment, benchmark, language).
  pub fn add_function(&self, deployment: &str, benchmark: &str, language: Language, record: FunctionRecord) -> Result<(), CacheError> {
    check_name("deployment", deployment)?;
    check_name("benchmark", benchmark)?;
    let mut state = self.state();

    let mut index = state.index(&self.root, benchmark).clone();
    let has_code = index
      .get(deployment)
      .and_then(|d| d.languages.get(language.as_str()))
      .is_some_and(LanguageEntry::has_artifacts);
    if !has_code {
      return Err(CacheError::MissingArtifact {
        deployment: deployment.to_string(),
        benchmark: benchmark.to_string(),
        language,
        function: record.name,
      });
    }

    let name = record.name.clone();
    language_entry(&mut index, deployment, language)
      .functions
      .insert(name.clone(), record);
    state.commit(&self.root, benchmark, index)?;

    info!(deployment, benchmark, function = %name, "function cached");
    Ok(())
  }

  /// Replace an existing function record with the same name and language,
  /// whichever deployment holds it.
  ///
  /// Returns `false` (and logs a warning) when no such record exists; the
  /// record is not created.
  pub fn update_function(&self, record: &FunctionRecord) -> Result<bool, CacheError> {
    check_name("benchmark", &record.benchmark)?;
    let mut state = self.state();

    let mut index = state.index(&self.root, &record.benchmark).clone();
    let slot = index
      .values_mut()
      .filter_map(|d| d.languages.get_mut(record.language.as_str()))
      .find_map(|l| l.functions.get_mut(&record.name));

    let Some(slot) = slot else {
      warn!(
        benchmark = %record.benchmark,
        function = %record.name,
        language = %record.language,
        "function not cached, skipping update"
      );
      return Ok(false);
    };

    *slot = record.clone();
    state.commit(&self.root, &record.benchmark, index)?;
    debug!(function = %record.name, "function updated");
    Ok(true)
  }

  // === Resources ===

  pub fn get_resource_config(&self, deployment: &str, benchmark: &str, kind: ResourceKind) -> Option<ResourceConfig> {
    check_name("benchmark", benchmark).ok()?;
    let mut state = self.state();
    state
      .index(&self.root, benchmark)
      .get(deployment)
      .and_then(|d| d.resource(kind))
      .cloned()
  }

  pub fn update_resource_config(
    &self,
    deployment: &str,
    benchmark: &str,
    kind: ResourceKind,
    config: ResourceConfig,
  ) -> Result<(), CacheError> {
    check_name("deployment", deployment)?;
    check_name("benchmark", benchmark)?;
    let mut state = self.state();

    let mut index = state.index(&self.root, benchmark).clone();
    *index.entry(deployment.to_string()).or_default().resource_mut(kind) = Some(config);
    state.commit(&self.root, benchmark, index)?;
    debug!(deployment, benchmark, kind = %kind, "resource config updated");
    Ok(())
  }

  // === Benchmarks ===

  /// Everything cached for a benchmark on one deployment.
  pub fn get_benchmark_config(&self, deployment: &str, benchmark: &str) -> Option<DeploymentEntry> {
    check_name("benchmark", benchmark).ok()?;
    self.state().index(&self.root, benchmark).get(deployment).cloned()
  }

  /// Whole cache file of a benchmark, keyed by deployment.
  pub fn get_benchmark_index(&self, benchmark: &str) -> BenchmarkIndex {
    if check_name("benchmark", benchmark).is_err() {
      return BenchmarkIndex::new();
    }
    self.state().index(&self.root, benchmark).clone()
  }

  /// Names of benchmarks that have a cache file, sorted.
  pub fn list_benchmarks(&self) -> Result<Vec<String>, CacheError> {
    let entries = fs::read_dir(&self.root).map_err(|source| CacheError::Read {
      path: self.root.clone(),
      source,
    })?;

    let mut names: Vec<String> = entries
      .filter_map(|e| e.ok())
      .filter(|e| e.path().join(CONFIG_FILENAME).is_file())
      .map(|e| e.file_name().to_string_lossy().to_string())
      .collect();
    names.sort();
    Ok(names)
  }

  // === Provider configuration ===

  pub fn get_provider_config(&self, deployment: &str) -> Option<Value> {
    self.state().providers.get(deployment).cloned()
  }

  /// Deep-merge `value` into the deployment's configuration at `key_path`.
  ///
  /// Held in memory until [`shutdown`](Self::shutdown).
  pub fn update_provider_config_value(&self, deployment: &str, key_path: &[&str], value: Value) -> Result<(), CacheError> {
    check_name("deployment", deployment)?;
    let mut state = self.state();
    let config = state.providers.entry(deployment.to_string()).or_insert(Value::Null);
    provider::merge_at_path(config, key_path, value);
    state.dirty = true;
    Ok(())
  }

  /// Whether provider configuration awaits a flush.
  pub fn is_dirty(&self) -> bool {
    self.state().dirty
  }

  /// Flush provider configuration, one file per deployment, if anything changed.
  pub fn shutdown(&self) -> Result<(), CacheError> {
    let mut state = self.state();
    if !state.dirty {
      return Ok(());
    }

    for (deployment, config) in &state.providers {
      store::write_json(&provider_file(&self.root, deployment), config)?;
      info!(deployment = %deployment, "updated cached provider config");
    }
    state.dirty = false;
    Ok(())
  }
}
