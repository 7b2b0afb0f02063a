//! Implementation of the `brewkit install` command.
//!
//! Loads each recipe, derives its prefix and source checkout, and runs the
//! builds through the lifecycle. The process exit code reports the state the
//! first failed build stopped in.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use brewkit_lib::config::Config;
use brewkit_lib::lifecycle::{BuildJob, BuildResult, LifecycleError, run_many};
use brewkit_lib::runner::ProcessRunner;

use super::load_recipe;
use crate::output::{OutputFormat, format_duration, print_error, print_info, print_json, print_stat, print_step, print_success, symbols};

pub struct InstallArgs {
  pub recipes: Vec<PathBuf>,
  pub prefix: Option<PathBuf>,
  pub source: Option<PathBuf>,
  pub flags: Vec<String>,
  pub jobs: Option<usize>,
}

/// Execute the install command and return the process exit code.
pub fn cmd_install(args: InstallArgs, output: OutputFormat, verbose: bool) -> Result<i32> {
  if args.recipes.len() > 1 && (args.prefix.is_some() || args.source.is_some()) {
    bail!("--prefix and --source can only be used with a single recipe");
  }

  let config = Config::load().context("Failed to load configuration")?;

  let mut jobs = Vec::with_capacity(args.recipes.len());
  let mut packages = Vec::with_capacity(args.recipes.len());
  for recipe in &args.recipes {
    let definition = load_recipe(recipe)?;

    let prefix = match &args.prefix {
      Some(prefix) => {
        std::path::absolute(prefix).with_context(|| format!("Invalid install prefix: {}", prefix.display()))?
      }
      None => config
        .prefix_for(&definition.name)
        .context("Failed to determine install prefix")?,
    };
    let source = source_root(recipe, args.source.as_deref(), &config, &definition.name)?;

    debug!(package = %definition.name, prefix = %prefix.display(), source = %source.display(), "prepared job");
    packages.push(definition.name.clone());
    jobs.push(BuildJob::new(definition, source, prefix).with_flags(args.flags.iter().cloned()));
  }

  let parallelism = args.jobs.unwrap_or(config.parallelism);
  let runner = Arc::new(ProcessRunner::new().with_echo(verbose && !output.is_json()));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let results = rt.block_on(run_many(jobs, runner, config.environment_builder(), parallelism));
  let reports: Vec<JobReport<'_>> = packages
    .iter()
    .zip(&results)
    .map(|(package, result)| JobReport::new(package, result))
    .collect();

  if output.is_json() {
    match reports.as_slice() {
      [single] => print_json(single)?,
      all => print_json(&all)?,
    }
  } else {
    for report in &reports {
      match report {
        JobReport::Finished(result) => print_result(result, verbose),
        JobReport::Aborted { package, error } => print_error(&format!("{} did not complete: {}", package, error)),
      }
    }
  }

  Ok(overall_exit_code(&reports))
}

/// What one job produced. A job whose task died has no [`BuildResult`] but is
/// still reported next to the others.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JobReport<'a> {
  Finished(&'a BuildResult),
  Aborted { package: &'a str, error: String },
}

impl<'a> JobReport<'a> {
  fn new(package: &'a str, result: &'a Result<BuildResult, LifecycleError>) -> Self {
    match result {
      Ok(result) => JobReport::Finished(result),
      Err(e) => JobReport::Aborted {
        package,
        error: e.to_string(),
      },
    }
  }

  fn exit_code(&self) -> i32 {
    match self {
      JobReport::Finished(result) => result.exit_code(),
      JobReport::Aborted { .. } => 1,
    }
  }
}

/// Exit code of the first job, in command line order, that did not succeed.
fn overall_exit_code(reports: &[JobReport<'_>]) -> i32 {
  reports.iter().map(JobReport::exit_code).find(|code| *code != 0).unwrap_or(0)
}

/// Explicit `--source`, else `<source_root>/<name>` from the config, else
/// the directory the recipe lives in.
fn source_root(recipe: &Path, explicit: Option<&Path>, config: &Config, name: &str) -> Result<PathBuf> {
  let dir = match (explicit, &config.source_root) {
    (Some(dir), _) => dir.to_path_buf(),
    (None, Some(root)) => root.join(name),
    (None, None) => match recipe.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    },
  };

  dunce::canonicalize(&dir).with_context(|| format!("Source directory not found: {}", dir.display()))
}

fn print_result(result: &BuildResult, verbose: bool) {
  print_info(&format!(
    "{} {} {}",
    result.package,
    symbols::ARROW,
    result.prefix.display()
  ));

  for outcome in &result.outcomes {
    let detail = match (outcome.is_success(), outcome.exit_code) {
      (true, _) => format_duration(outcome.duration),
      (false, Some(code)) => format!("exit {code}"),
      (false, None) => "no exit code".to_string(),
    };
    print_step(outcome.is_success(), &format!("{} ({})", outcome.stage, detail));
  }

  match result.error() {
    None => {
      print_success(&format!("Installed {}", result.package));
      let runtime: Vec<&str> = result
        .dependencies
        .runtime_closure()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
      if !runtime.is_empty() {
        print_stat("Runtime dependencies", &runtime.join(", "));
      }
    }
    Some(reason) => {
      // Live output was already echoed in verbose mode.
      if !verbose && !result.output.is_empty() {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(result.output.as_bytes());
        if !result.output.ends_with_newline() {
          let _ = stderr.write_all(b"\n");
        }
      }
      print_error(&format!("{} failed: {}", result.package, reason));
    }
  }
}
