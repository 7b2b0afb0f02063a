//! Build failure kinds.
//!
//! Module errors carry sources and paths for diagnostics; [`BuildError`] is
//! the flattened, cloneable form recorded in a failed lifecycle state and
//! reported to callers.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::environment::EnvironmentError;
use crate::features::UnknownFeatureFlag;
use crate::package::DefinitionError;
use crate::resolve::ResolveError;
use crate::runner::CapturedOutput;
use crate::template::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildError {
  #[error("invalid package definition: {message}")]
  InvalidDefinition { message: String },

  #[error("{message}")]
  DuplicateDependencyConflict { name: String, message: String },

  #[error("{message}")]
  UnknownFeatureFlag { flag: String, message: String },

  #[error("environment setup failed: {message}")]
  EnvironmentSetupFailure { message: String },

  #[error("stage '{stage}' failed ({})", display_exit(.exit_code))]
  StageExecutionFailure {
    stage: String,
    exit_code: Option<i32>,
    output: CapturedOutput,
  },
}

fn display_exit(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {code}"),
    None => "no exit code".to_string(),
  }
}

impl BuildError {
  /// Stable identifier of the failure kind, as used in JSON output.
  pub fn kind(&self) -> &'static str {
    match self {
      BuildError::InvalidDefinition { .. } => "invalid_definition",
      BuildError::DuplicateDependencyConflict { .. } => "duplicate_dependency_conflict",
      BuildError::UnknownFeatureFlag { .. } => "unknown_feature_flag",
      BuildError::EnvironmentSetupFailure { .. } => "environment_setup_failure",
      BuildError::StageExecutionFailure { .. } => "stage_execution_failure",
    }
  }
}

impl From<DefinitionError> for BuildError {
  fn from(err: DefinitionError) -> Self {
    BuildError::InvalidDefinition {
      message: err.to_string(),
    }
  }
}

impl From<TemplateError> for BuildError {
  fn from(err: TemplateError) -> Self {
    BuildError::InvalidDefinition {
      message: err.to_string(),
    }
  }
}

impl From<ResolveError> for BuildError {
  fn from(err: ResolveError) -> Self {
    let message = err.to_string();
    match err {
      ResolveError::DuplicateDependencyConflict { name, .. } => BuildError::DuplicateDependencyConflict { name, message },
    }
  }
}

impl From<UnknownFeatureFlag> for BuildError {
  fn from(err: UnknownFeatureFlag) -> Self {
    BuildError::UnknownFeatureFlag {
      message: err.to_string(),
      flag: err.flag,
    }
  }
}

impl From<EnvironmentError> for BuildError {
  fn from(err: EnvironmentError) -> Self {
    match err {
      EnvironmentError::UnknownFeatureFlag(flag) => flag.into(),
      other => BuildError::EnvironmentSetupFailure {
        message: other.to_string(),
      },
    }
  }
}

impl From<ConfigError> for BuildError {
  fn from(err: ConfigError) -> Self {
    BuildError::EnvironmentSetupFailure {
      message: err.to_string(),
    }
  }
}
