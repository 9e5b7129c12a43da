//! Benchmark input generation and upload.
//!
//! Each benchmark that needs input data implements [`BenchmarkInputProvider`]
//! and is registered by name in an [`InputRegistry`]. [`prepare_input`]
//! allocates storage prefixes for it, remembers them in the artifact cache and
//! skips the upload when a previous run already did it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cache::{ArtifactCache, CacheError, ResourceConfig, ResourceKind};
use crate::types::InputSize;
use crate::util::fs::{FsError, copy_file, create_dir_all};

#[derive(Debug, Error)]
pub enum InputError {
  #[error("no input generator registered for benchmark {0}")]
  UnknownBenchmark(String),

  #[error("benchmark {benchmark} needs a data directory")]
  MissingDataDir { benchmark: String },

  #[error("input bucket {index} requested, benchmark declares {count}")]
  BucketIndex { index: usize, count: usize },

  #[error("failed to read input data {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to upload {key}: {source}")]
  Upload {
    key: String,
    #[source]
    source: FsError,
  },

  #[error(transparent)]
  Cache(#[from] CacheError),
}

/// Storage prefixes allocated to one benchmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketNames {
  pub input: Vec<String>,
  pub output: Vec<String>,
}

impl BucketNames {
  /// `<benchmark>-<idx>-input` / `<benchmark>-<idx>-output` for the given counts.
  pub fn allocate(benchmark: &str, inputs: usize, outputs: usize) -> Self {
    Self {
      input: (0..inputs).map(|i| format!("{}-{}-input", benchmark, i)).collect(),
      output: (0..outputs).map(|i| format!("{}-{}-output", benchmark, i)).collect(),
    }
  }
}

/// Upload callback handed to input generators: `(bucket index, object key, local file)`.
pub type UploadFn<'a> = dyn FnMut(usize, &str, &Path) -> Result<(), InputError> + 'a;

/// Input generation routine of one benchmark.
pub trait BenchmarkInputProvider: Send + Sync {
  /// Number of (input, output) storage prefixes the benchmark uses.
  fn bucket_count(&self) -> (usize, usize);

  /// Produce the invocation payload for `size`, uploading any data files
  /// through `upload`.
  fn generate_input(
    &self,
    data_dir: Option<&Path>,
    size: InputSize,
    buckets: &BucketNames,
    upload: &mut UploadFn<'_>,
  ) -> Result<Value, InputError>;
}

/// Destination for uploaded benchmark input.
pub trait ObjectStorage {
  fn upload(&self, prefix: &str, key: &str, file: &Path) -> Result<(), InputError>;
}

/// Object storage backed by a local directory: `<root>/<prefix>/<key>`.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
  root: PathBuf,
}

impl DirectoryStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl ObjectStorage for DirectoryStorage {
  fn upload(&self, prefix: &str, key: &str, file: &Path) -> Result<(), InputError> {
    let dest = self.root.join(prefix).join(key);
    let upload_err = |source| InputError::Upload {
      key: key.to_string(),
      source,
    };

    if let Some(parent) = dest.parent() {
      create_dir_all(parent).map_err(upload_err)?;
    }
    copy_file(file, &dest).map_err(upload_err)?;
    debug!(prefix, key, "uploaded input file");
    Ok(())
  }
}

/// `010.sleep`: sleeps for a size-dependent number of seconds.
pub struct SleepInput;

impl BenchmarkInputProvider for SleepInput {
  fn bucket_count(&self) -> (usize, usize) {
    (0, 0)
  }

  fn generate_input(
    &self,
    _data_dir: Option<&Path>,
    size: InputSize,
    _buckets: &BucketNames,
    _upload: &mut UploadFn<'_>,
  ) -> Result<Value, InputError> {
    let seconds = match size {
      InputSize::Test => 1,
      InputSize::Small => 100,
      InputSize::Large => 1000,
    };
    Ok(json!({ "sleep": seconds }))
  }
}

/// `110.dynamic-html`: renders a page with a size-dependent list of random numbers.
pub struct DynamicHtmlInput;

impl BenchmarkInputProvider for DynamicHtmlInput {
  fn bucket_count(&self) -> (usize, usize) {
    (0, 0)
  }

  fn generate_input(
    &self,
    _data_dir: Option<&Path>,
    size: InputSize,
    _buckets: &BucketNames,
    _upload: &mut UploadFn<'_>,
  ) -> Result<Value, InputError> {
    let random_len = match size {
      InputSize::Test => 10,
      InputSize::Small => 1000,
      InputSize::Large => 100_000,
    };
    Ok(json!({ "username": "testname", "random_len": random_len }))
  }
}

/// `311.compression`: uploads every dataset directory and compresses the first one.
pub struct CompressionInput;

impl CompressionInput {
  const NAME: &'static str = "311.compression";
}

impl BenchmarkInputProvider for CompressionInput {
  fn bucket_count(&self) -> (usize, usize) {
    (1, 1)
  }

  fn generate_input(
    &self,
    data_dir: Option<&Path>,
    _size: InputSize,
    buckets: &BucketNames,
    upload: &mut UploadFn<'_>,
  ) -> Result<Value, InputError> {
    let data_dir = data_dir.ok_or_else(|| InputError::MissingDataDir {
      benchmark: Self::NAME.to_string(),
    })?;
    let read_err = |source| InputError::Read {
      path: data_dir.to_path_buf(),
      source,
    };

    let mut datasets: Vec<PathBuf> = fs::read_dir(data_dir)
      .map_err(read_err)?
      .filter_map(|e| e.ok())
      .map(|e| e.path())
      .filter(|p| p.is_dir())
      .collect();
    datasets.sort();

    for dataset in &datasets {
      for entry in WalkDir::new(dataset).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
          continue;
        }
        let rel = entry.path().strip_prefix(data_dir).unwrap_or(entry.path());
        let key = rel
          .components()
          .map(|c| c.as_os_str().to_string_lossy())
          .collect::<Vec<_>>()
          .join("/");
        upload(0, &key, entry.path())?;
      }
    }

    let first = datasets
      .first()
      .and_then(|d| d.file_name())
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();

    Ok(json!({
      "object": { "key": first },
      "bucket": {
        "input": buckets.input.first(),
        "output": buckets.output.first(),
      }
    }))
  }
}

/// Input generators by benchmark name.
pub struct InputRegistry {
  providers: BTreeMap<String, Box<dyn BenchmarkInputProvider>>,
}

impl InputRegistry {
  /// A registry with no generators.
  pub fn empty() -> Self {
    Self {
      providers: BTreeMap::new(),
    }
  }

  pub fn register(&mut self, benchmark: impl Into<String>, provider: impl BenchmarkInputProvider + 'static) {
    self.providers.insert(benchmark.into(), Box::new(provider));
  }

  pub fn get(&self, benchmark: &str) -> Option<&dyn BenchmarkInputProvider> {
    self.providers.get(benchmark).map(|p| p.as_ref())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.providers.keys().map(String::as_str)
  }
}

impl Default for InputRegistry {
  /// Registry holding the built-in generators.
  fn default() -> Self {
    let mut registry = Self::empty();
    registry.register("010.sleep", SleepInput);
    registry.register("110.dynamic-html", DynamicHtmlInput);
    registry.register(CompressionInput::NAME, CompressionInput);
    registry
  }
}

/// Generate the invocation input of `benchmark`, uploading its data once.
///
/// Storage prefixes cached for (deployment, benchmark) are reused when their
/// counts still match the generator. When the cached configuration records a
/// completed upload, files are not uploaded again.
pub fn prepare_input(
  cache: &ArtifactCache,
  registry: &InputRegistry,
  storage: &dyn ObjectStorage,
  deployment: &str,
  benchmark: &str,
  size: InputSize,
  data_dir: Option<&Path>,
) -> Result<Value, InputError> {
  let provider = registry
    .get(benchmark)
    .ok_or_else(|| InputError::UnknownBenchmark(benchmark.to_string()))?;
  let (inputs, outputs) = provider.bucket_count();

  let cached = cache.get_resource_config(deployment, benchmark, ResourceKind::Storage);
  let mut config = match cached {
    Some(config) if config.input_prefixes.len() == inputs && config.output_prefixes.len() == outputs => {
      debug!(deployment, benchmark, "reusing cached storage prefixes");
      config
    }
    previous => {
      let buckets = BucketNames::allocate(benchmark, inputs, outputs);
      ResourceConfig {
        input_prefixes: buckets.input,
        output_prefixes: buckets.output,
        input_uploaded: false,
        ..previous.unwrap_or_default()
      }
    }
  };

  let buckets = BucketNames {
    input: config.input_prefixes.clone(),
    output: config.output_prefixes.clone(),
  };
  let skip_upload = config.input_uploaded;
  let mut uploaded = 0usize;

  let mut upload = |index: usize, key: &str, file: &Path| -> Result<(), InputError> {
    if skip_upload {
      return Ok(());
    }
    let prefix = buckets.input.get(index).ok_or(InputError::BucketIndex {
      index,
      count: buckets.input.len(),
    })?;
    storage.upload(prefix, key, file)?;
    uploaded += 1;
    Ok(())
  };

  let input = provider.generate_input(data_dir, size, &buckets, &mut upload)?;

  if skip_upload {
    info!(deployment, benchmark, "input already uploaded, skipping");
  } else {
    info!(deployment, benchmark, files = uploaded, "benchmark input uploaded");
    config.input_uploaded = true;
    cache.update_resource_config(deployment, benchmark, ResourceKind::Storage, config)?;
  }

  Ok(input)
}
