//! Terminal rendering for `sebs`.
//!
//! Build outcomes, cache contents and prepared inputs are printed either as
//! colored text (colors only when stdout supports them) or, with
//! `--output json`, as the library types serialized to pretty JSON.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use sebs_lib::build::{BuildOutcome, BuildRequest};
use sebs_lib::cache::{Artifact, ArtifactKind, BenchmarkIndex};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const DONE: &str = "✓";
const FAILED: &str = "✗";
const NOTE: &str = "•";
const ITEM: &str = "→";

/// Leading 12 characters of a digest.
pub fn short_hash(hash: &str) -> &str {
  hash.get(..12).unwrap_or(hash)
}

/// Artifact sizes in binary units, one decimal above a kilobyte.
pub fn human_size(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];
  if bytes < 1024 {
    return format!("{} B", bytes);
  }

  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

/// Duration rounded to whole milliseconds (`1s 250ms`).
pub fn elapsed(duration: Duration) -> String {
  humantime::format_duration(Duration::from_millis(duration.as_millis() as u64)).to_string()
}

/// Time between `date` and `now`, rounded to seconds.
pub fn age(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let since = (now - date).to_std().unwrap_or_default();
  humantime::format_duration(Duration::from_secs(since.as_secs())).to_string()
}

pub fn print_success(message: &str) {
  println!("{} {}", DONE.if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    FAILED.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!("{} {}", NOTE.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn print_field(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// Result of `sebs build`: whether the package was rebuilt and where it lives.
pub fn print_build_outcome(request: &BuildRequest, outcome: &BuildOutcome, took: Duration) {
  println!();
  if outcome.rebuilt {
    let reason = match (outcome.is_cached, outcome.is_cached_valid) {
      (false, _) => "first build",
      (true, false) => "sources changed",
      (true, true) => "forced",
    };
    print_success(&format!("Built {} ({})", request.key(), reason));
  } else {
    print_info(&format!("Using cached package for {}", request.key()));
  }

  print_field("Location", &outcome.location.display().to_string());
  print_field("Size", &human_size(outcome.size));
  print_field("Hash", short_hash(&outcome.hash));
  if let Some(image) = &outcome.image {
    print_field("Image", &image.uri);
  }
  print_field("Duration", &elapsed(took));
}

/// Per-benchmark totals shown by `sebs cache list`.
#[derive(Debug, Serialize)]
pub struct CacheSummary {
  pub benchmark: String,
  pub deployments: Vec<String>,
  pub artifacts: usize,
  pub functions: usize,
}

impl CacheSummary {
  pub fn new(benchmark: String, index: &BenchmarkIndex) -> Self {
    let languages = || index.values().flat_map(|d| d.languages.values());
    Self {
      benchmark,
      deployments: index.keys().cloned().collect(),
      artifacts: languages().map(|l| l.code_package.len() + l.containers.len()).sum(),
      functions: languages().map(|l| l.functions.len()).sum(),
    }
  }

  fn line(&self) -> String {
    format!(
      "{} ({}): {} artifact(s), {} function(s)",
      self.benchmark,
      self.deployments.join(", "),
      self.artifacts,
      self.functions
    )
  }
}

pub fn print_cache_summaries(summaries: &[CacheSummary]) {
  if summaries.is_empty() {
    print_info("Cache is empty");
    return;
  }
  for summary in summaries {
    print_info(&summary.line());
  }
}

fn artifact_line(language: &str, version: &str, kind: ArtifactKind, artifact: &Artifact, now: DateTime<Utc>) -> String {
  format!(
    "{} {} {} {} {}, modified {} ago",
    language,
    version,
    kind.storage_dir(),
    short_hash(&artifact.hash),
    human_size(artifact.size),
    age(artifact.date.modified, now)
  )
}

/// Everything cached for one benchmark, grouped by deployment and language.
pub fn print_benchmark_index(benchmark: &str, index: &BenchmarkIndex) {
  if index.is_empty() {
    print_info(&format!("Nothing cached for {}", benchmark));
    return;
  }

  let now = Utc::now();
  println!("{}", benchmark.if_supports_color(Stream::Stdout, |s| s.bold()));
  for (deployment, entry) in index {
    println!("  {}", deployment);
    for (language, lang) in &entry.languages {
      for kind in [ArtifactKind::CodePackage, ArtifactKind::Container] {
        for (version, artifact) in lang.artifacts(kind) {
          println!("    {} {}", ITEM, artifact_line(language, version, kind, artifact, now));
        }
      }
      for name in lang.functions.keys() {
        println!("    {} function {}", ITEM, name);
      }
    }
    if let Some(storage) = &entry.storage {
      println!("    {} storage inputs: {}", ITEM, storage.input_prefixes.join(", "));
    }
  }
}
