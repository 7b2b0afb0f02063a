use std::fmt;

use serde::Serialize;

use crate::error::BuildError;
use crate::package::Phase;
use crate::runner::StepOutcome;

/// Discriminant of [`LifecycleState`], used for transition checks and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
  Pending,
  Resolving,
  Configuring,
  Building,
  Installing,
  Done,
  Failed,
}

impl StateKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      StateKind::Pending => "pending",
      StateKind::Resolving => "resolving",
      StateKind::Configuring => "configuring",
      StateKind::Building => "building",
      StateKind::Installing => "installing",
      StateKind::Done => "done",
      StateKind::Failed => "failed",
    }
  }

  /// The state in which stages of `phase` run.
  pub fn for_phase(phase: Phase) -> Self {
    match phase {
      Phase::Configure => StateKind::Configuring,
      Phase::Build => StateKind::Building,
      Phase::Install => StateKind::Installing,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, StateKind::Done | StateKind::Failed)
  }

  /// Whether the lifecycle may move from `self` to `next`.
  ///
  /// The happy path is strictly linear. `Failed` is reachable from every
  /// non-terminal state; nothing leaves a terminal state.
  pub fn can_transition_to(&self, next: StateKind) -> bool {
    use StateKind::*;

    if self.is_terminal() {
      return false;
    }
    if next == Failed {
      return true;
    }

    matches!(
      (self, next),
      (Pending, Resolving)
        | (Resolving, Configuring)
        | (Configuring, Building)
        | (Building, Installing)
        | (Installing, Done)
    )
  }

  /// Process exit code reported when a build fails in this state.
  pub fn failure_exit_code(&self) -> i32 {
    match self {
      StateKind::Pending | StateKind::Resolving => 2,
      StateKind::Configuring => 3,
      StateKind::Building => 4,
      StateKind::Installing => 5,
      StateKind::Done | StateKind::Failed => 1,
    }
  }
}

impl fmt::Display for StateKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where a package build currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LifecycleState {
  Pending,
  Resolving,
  Configuring,
  Building,
  Installing,
  Done {
    #[serde(skip)]
    outcomes: Vec<StepOutcome>,
  },
  Failed {
    /// State that was active when the failure happened.
    during: StateKind,
    /// Failing stage; `None` when the build failed before any stage ran.
    stage: Option<String>,
    reason: BuildError,
  },
}

impl LifecycleState {
  pub fn kind(&self) -> StateKind {
    match self {
      LifecycleState::Pending => StateKind::Pending,
      LifecycleState::Resolving => StateKind::Resolving,
      LifecycleState::Configuring => StateKind::Configuring,
      LifecycleState::Building => StateKind::Building,
      LifecycleState::Installing => StateKind::Installing,
      LifecycleState::Done { .. } => StateKind::Done,
      LifecycleState::Failed { .. } => StateKind::Failed,
    }
  }

  pub fn can_transition_to(&self, next: &LifecycleState) -> bool {
    self.kind().can_transition_to(next.kind())
  }

  /// Plain state for a phase, used when entering it.
  pub(crate) fn entering(kind: StateKind) -> Option<Self> {
    match kind {
      StateKind::Pending => Some(LifecycleState::Pending),
      StateKind::Resolving => Some(LifecycleState::Resolving),
      StateKind::Configuring => Some(LifecycleState::Configuring),
      StateKind::Building => Some(LifecycleState::Building),
      StateKind::Installing => Some(LifecycleState::Installing),
      StateKind::Done | StateKind::Failed => None,
    }
  }
}

impl fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LifecycleState::Failed {
        stage: Some(stage), ..
      } => write!(f, "failed at {stage}"),
      other => f.write_str(other.kind().as_str()),
    }
  }
}
