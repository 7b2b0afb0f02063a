//! brewkit-lib: package build lifecycle orchestration
//!
//! This crate runs declarative package recipes:
//! - `PackageDefinition`: what a package depends on, which feature flags it
//!   recognizes and which stages build it
//! - `resolve`: splits dependencies into build-time and runtime sets
//! - `Environment`: the isolated process environment of one build run
//! - `StepRunner`: executes one stage as an external command
//! - `Lifecycle`: drives a build from `Pending` to `Done` or `Failed`

pub mod config;
pub mod consts;
pub mod environment;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod package;
pub mod platform;
pub mod resolve;
pub mod runner;
pub mod template;
pub mod util;

pub use error::BuildError;
