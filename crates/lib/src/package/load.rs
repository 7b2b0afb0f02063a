use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::{PackageDefinition, Phase};
use crate::template::{self, TemplateError};

/// Errors raised while loading or validating a package definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("failed to read recipe {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse recipe: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("package name must not be empty")]
  EmptyName,

  #[error("stage name must not be empty (stage #{0})")]
  EmptyStageName(usize),

  #[error("duplicate stage name: {0}")]
  DuplicateStage(String),

  #[error("duplicate feature option: {0}")]
  DuplicateOption(String),

  #[error("stage '{stage}' has no program")]
  EmptyProgram { stage: String },

  #[error("stage '{stage}' ({phase}) is declared after a {previous} stage")]
  StageOutOfOrder { stage: String, phase: Phase, previous: Phase },

  #[error("stage '{stage}' working directory must stay inside the source checkout: {}", .dir.display())]
  WorkingDirOutsideSource { stage: String, dir: PathBuf },

  #[error("stage '{stage}' has an invalid argument template: {source}")]
  Template {
    stage: String,
    #[source]
    source: TemplateError,
  },
}

impl PackageDefinition {
  /// Parse a definition from JSON. The result is not validated.
  pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Read, parse and validate a recipe file.
  pub fn from_file(path: &Path) -> Result<Self, DefinitionError> {
    debug!(path = %path.display(), "loading recipe");
    let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let definition = Self::from_json(&content)?;
    definition.validate()?;
    Ok(definition)
  }

  /// Check the structural invariants the lifecycle relies on.
  pub fn validate(&self) -> Result<(), DefinitionError> {
    if self.name.trim().is_empty() {
      return Err(DefinitionError::EmptyName);
    }

    let mut options = HashSet::new();
    for option in &self.options {
      if !options.insert(option.name.as_str()) {
        return Err(DefinitionError::DuplicateOption(option.name.clone()));
      }
    }

    let mut names = HashSet::new();
    let mut previous: Option<Phase> = None;

    for (idx, stage) in self.stages.iter().enumerate() {
      if stage.name.trim().is_empty() {
        return Err(DefinitionError::EmptyStageName(idx));
      }
      if !names.insert(stage.name.as_str()) {
        return Err(DefinitionError::DuplicateStage(stage.name.clone()));
      }
      if stage.program.trim().is_empty() {
        return Err(DefinitionError::EmptyProgram {
          stage: stage.name.clone(),
        });
      }
      match previous {
        Some(prev) if stage.phase < prev => {
          return Err(DefinitionError::StageOutOfOrder {
            stage: stage.name.clone(),
            phase: stage.phase,
            previous: prev,
          });
        }
        _ => {}
      }
      previous = Some(stage.phase);

      let escapes = stage
        .working_dir
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_) | Component::ParentDir));
      if escapes {
        return Err(DefinitionError::WorkingDirOutsideSource {
          stage: stage.name.clone(),
          dir: stage.working_dir.clone(),
        });
      }

      for arg in std::iter::once(&stage.program).chain(&stage.args) {
        template::parse(arg).map_err(|source| DefinitionError::Template {
          stage: stage.name.clone(),
          source,
        })?;
      }
    }

    Ok(())
  }
}
