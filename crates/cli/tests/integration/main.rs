//! Integration tests for the sebs CLI.

mod build_tests;
mod cache_tests;
mod common;
mod config_tests;
mod prepare_tests;
