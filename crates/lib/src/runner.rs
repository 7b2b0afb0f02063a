//! Build stage execution.
//!
//! This module runs one build stage as a child process:
//! - The environment is cleared and replaced by the run's [`Environment`]
//! - The working directory is passed explicitly, never inherited
//! - stdout and stderr are captured into one buffer in arrival order
//! - The command runs exactly once; a non-zero exit is a failure
//!
//! [`StepRunner`] is the seam the lifecycle drives, so alternative runners
//! (recording, remote, sandboxed) can be swapped in.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::environment::Environment;
use crate::package::BuildStage;
use crate::template::{self, TemplateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
  Success,
  Failure,
}

/// Bytes a stage wrote to stdout and stderr, exactly as received.
///
/// Decoding happens only for display and JSON, where invalid UTF-8 is
/// replaced with U+FFFD.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput(Vec<u8>);

impl CapturedOutput {
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn ends_with_newline(&self) -> bool {
    self.0.last() == Some(&b'\n')
  }

  pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(&self.0)
  }
}

impl fmt::Debug for CapturedOutput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match std::str::from_utf8(&self.0) {
      Ok(text) => fmt::Debug::fmt(text, f),
      Err(_) => write!(f, "b\"{}\"", self.0.escape_ascii()),
    }
  }
}

impl Serialize for CapturedOutput {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string_lossy())
  }
}

impl From<Vec<u8>> for CapturedOutput {
  fn from(bytes: Vec<u8>) -> Self {
    Self(bytes)
  }
}

impl From<String> for CapturedOutput {
  fn from(text: String) -> Self {
    Self(text.into_bytes())
  }
}

impl From<&str> for CapturedOutput {
  fn from(text: &str) -> Self {
    Self(text.as_bytes().to_vec())
  }
}

impl PartialEq<&str> for CapturedOutput {
  fn eq(&self, other: &&str) -> bool {
    self.0 == other.as_bytes()
  }
}

impl PartialEq<String> for CapturedOutput {
  fn eq(&self, other: &String) -> bool {
    self.0 == other.as_bytes()
  }
}

/// Result of running one build stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
  pub stage: String,
  /// Position of the stage in its definition.
  pub index: usize,
  pub status: StepStatus,
  /// `None` when the process was terminated by a signal or never started.
  pub exit_code: Option<i32>,
  /// Combined stdout and stderr, unmodified.
  pub output: CapturedOutput,
  pub duration: Duration,
}

impl StepOutcome {
  pub fn success(stage: impl Into<String>, output: impl Into<CapturedOutput>) -> Self {
    Self {
      stage: stage.into(),
      index: 0,
      status: StepStatus::Success,
      exit_code: Some(0),
      output: output.into(),
      duration: Duration::ZERO,
    }
  }

  pub fn failure(stage: impl Into<String>, exit_code: Option<i32>, output: impl Into<CapturedOutput>) -> Self {
    Self {
      stage: stage.into(),
      index: 0,
      status: StepStatus::Failure,
      exit_code,
      output: output.into(),
      duration: Duration::ZERO,
    }
  }

  pub fn with_index(mut self, index: usize) -> Self {
    self.index = index;
    self
  }

  pub fn with_duration(mut self, duration: Duration) -> Self {
    self.duration = duration;
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == StepStatus::Success
  }
}

#[derive(Debug, Error)]
pub enum RunError {
  #[error("stage '{stage}' has an invalid argument: {source}")]
  Template {
    stage: String,
    #[source]
    source: TemplateError,
  },

  #[error("failed to start '{program}' in {}: {source}", .working_dir.display())]
  Spawn {
    program: String,
    working_dir: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("i/o error while running '{program}': {source}")]
  Io {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

/// Executes build stages.
pub trait StepRunner: Send + Sync {
  /// Run `stage` once in `working_dir` with exactly the variables of `env`.
  ///
  /// A command that starts and exits non-zero is an `Ok` failure outcome;
  /// `Err` is reserved for commands that could not be run at all.
  fn run(
    &self,
    stage: &BuildStage,
    env: &Environment,
    working_dir: &Path,
  ) -> impl Future<Output = Result<StepOutcome, RunError>> + Send;
}

impl<R: StepRunner> StepRunner for &R {
  fn run(
    &self,
    stage: &BuildStage,
    env: &Environment,
    working_dir: &Path,
  ) -> impl Future<Output = Result<StepOutcome, RunError>> + Send {
    (**self).run(stage, env, working_dir)
  }
}

impl<R: StepRunner> StepRunner for Arc<R> {
  fn run(
    &self,
    stage: &BuildStage,
    env: &Environment,
    working_dir: &Path,
  ) -> impl Future<Output = Result<StepOutcome, RunError>> + Send {
    (**self).run(stage, env, working_dir)
  }
}

/// Runs stages as real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
  echo: bool,
}

impl ProcessRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copy output to stderr as it arrives, in addition to capturing it.
  pub fn with_echo(mut self, echo: bool) -> Self {
    self.echo = echo;
    self
  }
}

impl StepRunner for ProcessRunner {
  async fn run(&self, stage: &BuildStage, env: &Environment, working_dir: &Path) -> Result<StepOutcome, RunError> {
    let args = template::expand_args(&stage.args, env).map_err(|source| RunError::Template {
      stage: stage.name.clone(),
      source,
    })?;
    let program = template::substitute(&stage.program, env).map_err(|source| RunError::Template {
      stage: stage.name.clone(),
      source,
    })?;
    let program_path = resolve_program(&program, working_dir);

    info!(stage = %stage.name, program = %program, args = ?args, "running stage");
    debug!(working_dir = %working_dir.display(), "spawning process");

    let started = Instant::now();

    let mut child = Command::new(&program_path)
      .args(&args)
      .current_dir(working_dir)
      .env_clear()
      .envs(env.vars())
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| RunError::Spawn {
        program: program.clone(),
        working_dir: working_dir.to_path_buf(),
        source,
      })?;

    let io_err = |source| RunError::Io {
      program: program.clone(),
      source,
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let output = match (stdout, stderr) {
      (Some(out), Some(err)) => capture_combined(out, err, self.echo).await.map_err(io_err)?,
      _ => CapturedOutput::default(),
    };
    let status = child.wait().await.map_err(io_err)?;
    let duration = started.elapsed();

    let outcome = if status.success() {
      StepOutcome::success(&stage.name, output)
    } else {
      StepOutcome::failure(&stage.name, status.code(), output)
    };

    debug!(
      stage = %stage.name,
      exit_code = ?outcome.exit_code,
      elapsed_ms = duration.as_millis() as u64,
      "stage exited"
    );

    Ok(outcome.with_duration(duration))
  }
}

/// Relative programs with a path component (`./waf`) are looked up in the
/// working directory; bare names go through the environment's PATH.
fn resolve_program(program: &str, working_dir: &Path) -> PathBuf {
  let path = Path::new(program);
  if path.is_relative() && path.components().count() > 1 {
    working_dir.join(path)
  } else {
    path.to_path_buf()
  }
}

/// Read both pipes until they close, appending chunks in arrival order.
async fn capture_combined<O, E>(mut stdout: O, mut stderr: E, echo: bool) -> std::io::Result<CapturedOutput>
where
  O: AsyncRead + Unpin,
  E: AsyncRead + Unpin,
{
  let mut combined = Vec::new();
  let mut out_buf = [0u8; 8192];
  let mut err_buf = [0u8; 8192];
  let mut out_open = true;
  let mut err_open = true;
  let mut console = tokio::io::stderr();

  while out_open || err_open {
    let (from_stdout, n) = tokio::select! {
      read = stdout.read(&mut out_buf), if out_open => (true, read?),
      read = stderr.read(&mut err_buf), if err_open => (false, read?),
    };

    let chunk = match (from_stdout, n) {
      (true, 0) => {
        out_open = false;
        continue;
      }
      (false, 0) => {
        err_open = false;
        continue;
      }
      (true, n) => &out_buf[..n],
      (false, n) => &err_buf[..n],
    };

    combined.extend_from_slice(chunk);
    if echo {
      console.write_all(chunk).await?;
    }
  }

  Ok(CapturedOutput(combined))
}
