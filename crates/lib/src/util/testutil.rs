//! Test utilities for brewkit-lib.
//!
//! Shell command helpers for runner tests, the lossyWAV reference recipe,
//! and a scripted [`StepRunner`] for lifecycle tests that must not spawn
//! processes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::environment::Environment;
use crate::package::{BuildStage, Dependency, FeatureOption, PackageDefinition, Phase};
use crate::runner::{RunError, StepOutcome, StepRunner};
use crate::template;

/// Returns the shell command and args to execute a shell script.
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// Returns the command and args to create a marker file in the current directory.
pub fn touch_file(filename: &str) -> (&'static str, Vec<String>) {
  ("/usr/bin/touch", vec![filename.to_string()])
}

/// Returns the command and args to echo a message.
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

/// The lossyWAV recipe: waf configure/build/install, pkg-config at build
/// time, fftw at runtime, one `enable-fftw3` option.
pub fn lossywav() -> PackageDefinition {
  PackageDefinition::new("lossywav")
    .with_description("POSIX port of lossyWAV - a near lossless audio processor.")
    .with_homepage("https://github.com/MoSal/lossywav-for-posix")
    .with_head("https://github.com/MoSal/lossywav-for-posix.git")
    .with_dependency(Dependency::build("pkg-config"))
    .with_dependency(Dependency::runtime("fftw"))
    .with_option(FeatureOption::new(
      "enable-fftw3",
      "link against FFTW3 for transform acceleration",
    ))
    .with_stage(BuildStage::new("configure", Phase::Configure, "./waf").with_args([
      "configure",
      "--prefix={prefix}",
      "{flags}",
    ]))
    .with_stage(BuildStage::new("build", Phase::Build, "./waf").with_args(["build"]))
    .with_stage(BuildStage::new("install", Phase::Install, "./waf").with_args(["install"]))
}

/// One call observed by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub stage: String,
  pub program: String,
  pub args: Vec<String>,
  pub working_dir: PathBuf,
  pub prefix: PathBuf,
}

/// A runner that never spawns anything.
///
/// Every stage succeeds unless scripted otherwise with [`fail_on`](Self::fail_on)
/// or [`panic_in`](Self::panic_in).
#[derive(Debug, Default)]
pub struct RecordingRunner {
  failures: HashMap<String, (Option<i32>, String)>,
  panic_prefixes: HashSet<PathBuf>,
  invocations: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_on(mut self, stage: &str, exit_code: Option<i32>, output: &str) -> Self {
    self
      .failures
      .insert(stage.to_string(), (exit_code, output.to_string()));
    self
  }

  /// Panic on the first stage of any build installing into `prefix`.
  pub fn panic_in(mut self, prefix: impl Into<PathBuf>) -> Self {
    self.panic_prefixes.insert(prefix.into());
    self
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.invocations.lock().unwrap().clone()
  }

  pub fn stages_run(&self) -> Vec<String> {
    self.invocations().into_iter().map(|i| i.stage).collect()
  }
}

impl StepRunner for RecordingRunner {
  async fn run(&self, stage: &BuildStage, env: &Environment, working_dir: &Path) -> Result<StepOutcome, RunError> {
    let args = template::expand_args(&stage.args, env).map_err(|source| RunError::Template {
      stage: stage.name.clone(),
      source,
    })?;

    self.invocations.lock().unwrap().push(Invocation {
      stage: stage.name.clone(),
      program: stage.program.clone(),
      args,
      working_dir: working_dir.to_path_buf(),
      prefix: env.prefix().to_path_buf(),
    });

    if self.panic_prefixes.contains(env.prefix()) {
      panic!("runner panicked in stage {}", stage.name);
    }

    Ok(match self.failures.get(&stage.name) {
      Some((code, output)) => StepOutcome::failure(&stage.name, *code, output.as_str()),
      None => StepOutcome::success(&stage.name, format!("{} ok\n", stage.name)),
    })
  }
}
