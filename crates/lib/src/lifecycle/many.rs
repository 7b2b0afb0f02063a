use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::Lifecycle;
use super::types::{BuildResult, LifecycleError};
use crate::environment::EnvironmentBuilder;
use crate::package::PackageDefinition;
use crate::runner::StepRunner;

/// One package build to run with [`run_many`].
#[derive(Debug, Clone)]
pub struct BuildJob {
  pub definition: PackageDefinition,
  pub source_root: PathBuf,
  pub prefix: PathBuf,
  pub flags: Vec<String>,
}

impl BuildJob {
  pub fn new(definition: PackageDefinition, source_root: impl Into<PathBuf>, prefix: impl Into<PathBuf>) -> Self {
    Self {
      definition,
      source_root: source_root.into(),
      prefix: prefix.into(),
      flags: Vec::new(),
    }
  }

  pub fn with_flags<I, S>(mut self, flags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.flags.extend(flags.into_iter().map(Into::into));
    self
  }
}

/// Build independent packages concurrently.
///
/// At most `parallelism` builds run at a time (at least one). Each job gets
/// its own [`Lifecycle`]; results are returned in job order.
pub async fn run_many<R>(
  jobs: Vec<BuildJob>,
  runner: Arc<R>,
  env_builder: EnvironmentBuilder,
  parallelism: usize,
) -> Vec<Result<BuildResult, LifecycleError>>
where
  R: StepRunner + 'static,
{
  let parallelism = parallelism.max(1);
  info!(jobs = jobs.len(), parallelism, "starting concurrent builds");

  let semaphore = Arc::new(Semaphore::new(parallelism));

  // Every slot starts out as a panic; finished tasks overwrite theirs.
  let mut results: Vec<Result<BuildResult, LifecycleError>> = jobs
    .iter()
    .map(|job| {
      Err(LifecycleError::TaskPanicked {
        package: job.definition.name.clone(),
      })
    })
    .collect();

  let mut join_set = JoinSet::new();

  for (slot, job) in jobs.into_iter().enumerate() {
    let runner = runner.clone();
    let semaphore = semaphore.clone();
    let env_builder = env_builder.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire().await.ok();
      debug!(package = %job.definition.name, slot, "build slot acquired");

      let mut lifecycle = Lifecycle::new(job.source_root, runner).with_environment_builder(env_builder);
      let result = lifecycle.start(&job.definition, &job.prefix, job.flags.as_slice()).await;
      (slot, result)
    });
  }

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((slot, result)) => results[slot] = result,
      Err(e) => error!(error = %e, "build task panicked"),
    }
  }

  info!(
    succeeded = results.iter().filter(|r| matches!(r, Ok(b) if b.is_success())).count(),
    total = results.len(),
    "concurrent builds complete"
  );

  results
}
