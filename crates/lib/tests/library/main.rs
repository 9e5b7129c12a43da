//! End-to-end tests of the cache and build pipeline through the public API.

mod cache_tests;
mod common;
mod pipeline_tests;
