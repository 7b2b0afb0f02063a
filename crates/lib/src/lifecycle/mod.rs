//! Package build lifecycle.
//!
//! A [`Lifecycle`] drives one package through
//! `Pending → Resolving → Configuring → Building → Installing → Done`:
//! - Resolving validates the definition, resolves dependencies, builds the
//!   environment and checks the install prefix. Nothing is spawned.
//! - Each following state runs the definition's stages of its phase, in
//!   declared order, through the injected [`StepRunner`].
//! - The first failure moves the lifecycle to `Failed` and stops the build.
//!
//! Builds of independent packages can be run side by side with [`run_many`].

mod many;
mod state;
mod types;

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::environment::{self, Environment, EnvironmentBuilder};
use crate::error::BuildError;
use crate::package::{BuildStage, PackageDefinition, Phase};
use crate::resolve::{self, ResolvedDeps};
use crate::runner::{StepOutcome, StepRunner};

pub use many::{BuildJob, run_many};
pub use state::{LifecycleState, StateKind};
pub use types::{BuildResult, LifecycleError, Outcome};

const PHASES: [Phase; 3] = [Phase::Configure, Phase::Build, Phase::Install];

/// Runs the build of a single package.
#[derive(Debug)]
pub struct Lifecycle<R> {
  runner: R,
  source_root: PathBuf,
  env_builder: EnvironmentBuilder,
  state: LifecycleState,
  history: Vec<StateKind>,
}

impl<R: StepRunner> Lifecycle<R> {
  /// `source_root` is the checkout stage working directories are relative to.
  pub fn new(source_root: impl Into<PathBuf>, runner: R) -> Self {
    Self {
      runner,
      source_root: source_root.into(),
      env_builder: EnvironmentBuilder::default(),
      state: LifecycleState::Pending,
      history: vec![StateKind::Pending],
    }
  }

  pub fn with_environment_builder(mut self, builder: EnvironmentBuilder) -> Self {
    self.env_builder = builder;
    self
  }

  pub fn state(&self) -> &LifecycleState {
    &self.state
  }

  /// Every state entered so far, starting with `Pending`.
  pub fn history(&self) -> &[StateKind] {
    &self.history
  }

  /// Build and install `definition` into `prefix` with the given feature flags.
  ///
  /// A failing build is an `Ok` result in the `Failed` state. `Err` is only
  /// returned when the lifecycle was already started.
  pub async fn start<S: AsRef<str>>(
    &mut self,
    definition: &PackageDefinition,
    prefix: &Path,
    flags: &[S],
  ) -> Result<BuildResult, LifecycleError> {
    info!(package = %definition.name, prefix = %prefix.display(), "starting build");

    self.transition(LifecycleState::Resolving, &definition.name)?;

    let (deps, env) = match self.prepare(definition, prefix, flags) {
      Ok(prepared) => prepared,
      Err(reason) => {
        return self.fail(definition, prefix, None, reason, Vec::new(), ResolvedDeps::default());
      }
    };

    let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(definition.stages.len());

    for phase in PHASES {
      let entering = StateKind::for_phase(phase);
      if let Some(next) = LifecycleState::entering(entering) {
        self.transition(next, &definition.name)?;
      }

      for (index, stage) in definition.stages.iter().enumerate().filter(|(_, s)| s.phase == phase) {
        let outcome = self.run_stage(index, stage, &env).await;
        let succeeded = outcome.is_success();
        outcomes.push(outcome.clone());

        if !succeeded {
          let reason = BuildError::StageExecutionFailure {
            stage: outcome.stage.clone(),
            exit_code: outcome.exit_code,
            output: outcome.output,
          };
          return self.fail(definition, prefix, Some(stage.name.clone()), reason, outcomes, deps);
        }
      }
    }

    self.transition(
      LifecycleState::Done {
        outcomes: outcomes.clone(),
      },
      &definition.name,
    )?;

    info!(package = %definition.name, stages = outcomes.len(), "build succeeded");

    Ok(BuildResult::new(
      &definition.name,
      prefix.to_path_buf(),
      self.state.clone(),
      outcomes,
      deps,
      self.history.clone(),
    ))
  }

  /// The Resolving state's work. No process is spawned here.
  fn prepare<S: AsRef<str>>(
    &self,
    definition: &PackageDefinition,
    prefix: &Path,
    flags: &[S],
  ) -> Result<(ResolvedDeps, Environment), BuildError> {
    definition.validate()?;

    let deps = resolve::resolve(definition)?;
    debug!(
      package = %definition.name,
      build = deps.build.len(),
      runtime = deps.runtime.len(),
      names = ?deps.names(),
      "resolved dependencies"
    );

    let env = self.env_builder.build(definition, prefix, flags)?;
    environment::check_prefix(prefix)?;

    Ok((deps, env))
  }

  async fn run_stage(&self, index: usize, stage: &BuildStage, env: &Environment) -> StepOutcome {
    let working_dir = self.stage_dir(stage);
    debug!(stage = %stage.name, index, working_dir = %working_dir.display(), "running stage");

    match self.runner.run(stage, env, &working_dir).await {
      Ok(outcome) => outcome.with_index(index),
      Err(e) => {
        warn!(stage = %stage.name, error = %e, "stage could not be run");
        StepOutcome::failure(&stage.name, None, e.to_string()).with_index(index)
      }
    }
  }

  fn stage_dir(&self, stage: &BuildStage) -> PathBuf {
    let dir = stage.working_dir.as_path();
    if dir.as_os_str().is_empty() || dir == Path::new(".") {
      self.source_root.clone()
    } else {
      self.source_root.join(dir)
    }
  }

  fn fail(
    &mut self,
    definition: &PackageDefinition,
    prefix: &Path,
    stage: Option<String>,
    reason: BuildError,
    outcomes: Vec<StepOutcome>,
    deps: ResolvedDeps,
  ) -> Result<BuildResult, LifecycleError> {
    let during = self.state.kind();
    error!(
      package = %definition.name,
      state = %during,
      stage = stage.as_deref().unwrap_or("-"),
      error = %reason,
      "build failed"
    );

    self.transition(LifecycleState::Failed { during, stage, reason }, &definition.name)?;

    Ok(BuildResult::new(
      &definition.name,
      prefix.to_path_buf(),
      self.state.clone(),
      outcomes,
      deps,
      self.history.clone(),
    ))
  }

  fn transition(&mut self, next: LifecycleState, package: &str) -> Result<(), LifecycleError> {
    let from = self.state.kind();
    let to = next.kind();

    if !self.state.can_transition_to(&next) {
      return Err(LifecycleError::IllegalTransition { from, to });
    }

    info!(package = %package, from = %from, to = %to, "lifecycle transition");
    self.state = next;
    self.history.push(to);
    Ok(())
  }
}
