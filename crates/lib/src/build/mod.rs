//! Building deployable benchmark packages.
//!
//! A build turns a benchmark's sources into an artifact for one
//! (deployment, language, version, architecture) combination:
//!
//! 1. hash the sources and wrappers ([`ContentHasher`])
//! 2. reuse the cached artifact when the hash matches
//! 3. otherwise stage sources, run init scripts, inject wrappers and
//!    deployment dependencies, install dependencies in a builder container
//! 4. package the staged tree and record it in the [`ArtifactCache`](crate::cache::ArtifactCache)
//!
//! # Submodules
//!
//! - [`hash`] - Source hashing for staleness detection
//! - [`stage`] - Staging steps
//! - [`install`] - Builder container invocation
//! - [`package`] - Zip packaging
//! - [`pipeline`] - The build state machine

pub mod hash;
pub mod install;
pub mod package;
pub mod pipeline;
pub mod stage;
mod types;

pub use hash::ContentHasher;
pub use install::{BuilderContainerRunner, DockerCli};
pub use package::ZipPackager;
pub use pipeline::{BuildPaths, BuildPipeline};
pub use types::*;
