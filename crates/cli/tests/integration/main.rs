//! CLI integration tests for brewkit.
//!
//! Builds run against a fake `waf` script, so these tests need a Unix shell.

mod common;
#[cfg(unix)]
mod install_tests;
mod inspect_tests;
