//! Types produced by a lifecycle run.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::state::{LifecycleState, StateKind};
use crate::error::BuildError;
use crate::resolve::ResolvedDeps;
use crate::runner::{CapturedOutput, StepOutcome};

/// Errors in driving the lifecycle itself, as opposed to a failed build.
///
/// A build that fails still produces a [`BuildResult`]; these errors mean no
/// result could be produced at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
  #[error("illegal lifecycle transition from {from} to {to}")]
  IllegalTransition { from: StateKind, to: StateKind },

  #[error("build task for {package} panicked")]
  TaskPanicked { package: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Succeeded,
  Failed,
}

/// Terminal record of one package build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
  pub package: String,
  pub prefix: PathBuf,
  pub outcome: Outcome,
  pub state: LifecycleState,
  /// Index of the last stage that ran, `None` if none did.
  pub stage_index: Option<usize>,
  /// Exit status of the last stage that ran.
  pub exit_status: Option<i32>,
  /// Captured output of the last stage that ran.
  pub output: CapturedOutput,
  pub outcomes: Vec<StepOutcome>,
  pub dependencies: ResolvedDeps,
  pub history: Vec<StateKind>,
}

impl BuildResult {
  pub(crate) fn new(
    package: &str,
    prefix: PathBuf,
    state: LifecycleState,
    outcomes: Vec<StepOutcome>,
    dependencies: ResolvedDeps,
    history: Vec<StateKind>,
  ) -> Self {
    let outcome = match state {
      LifecycleState::Done { .. } => Outcome::Succeeded,
      _ => Outcome::Failed,
    };
    let last = outcomes.last();

    Self {
      package: package.to_string(),
      prefix,
      outcome,
      stage_index: last.map(|o| o.index),
      exit_status: last.and_then(|o| o.exit_code),
      output: last.map(|o| o.output.clone()).unwrap_or_default(),
      state,
      outcomes,
      dependencies,
      history,
    }
  }

  pub fn is_success(&self) -> bool {
    self.outcome == Outcome::Succeeded
  }

  /// Process exit code for this result: 0 on success, otherwise a code
  /// identifying the state the build failed in.
  pub fn exit_code(&self) -> i32 {
    match &self.state {
      LifecycleState::Done { .. } => 0,
      LifecycleState::Failed { during, .. } => during.failure_exit_code(),
      _ => 1,
    }
  }

  pub fn failed_stage(&self) -> Option<&str> {
    match &self.state {
      LifecycleState::Failed { stage, .. } => stage.as_deref(),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&BuildError> {
    match &self.state {
      LifecycleState::Failed { reason, .. } => Some(reason),
      _ => None,
    }
  }

  pub fn into_result(self) -> Result<Vec<StepOutcome>, BuildError> {
    match self.state {
      LifecycleState::Failed { reason, .. } => Err(reason),
      _ => Ok(self.outcomes),
    }
  }
}
