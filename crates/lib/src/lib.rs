//! sebs-lib: artifact cache and build pipeline for serverless benchmarks.
//!
//! This crate provides the pieces every deployment target shares:
//! - `ContentHasher`: decides whether benchmark sources changed since the last build
//! - `ArtifactCache`: durable store for packages, deployed functions and resources
//! - `BuildPipeline`: stages, installs and packages benchmark code, reusing the cache
//! - `benchmark`: benchmark discovery and input preparation

pub mod benchmark;
pub mod build;
pub mod cache;
pub mod config;
pub mod consts;
pub mod platform;
pub mod types;
pub mod util;
