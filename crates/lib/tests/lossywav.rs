//! End-to-end lifecycle runs against a fake `waf` build script.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use brewkit_lib::BuildError;
use brewkit_lib::environment::EnvironmentBuilder;
use brewkit_lib::lifecycle::{BuildJob, Lifecycle, LifecycleState, StateKind, run_many};
use brewkit_lib::package::{Dependency, PackageDefinition};
use brewkit_lib::runner::ProcessRunner;
use tempfile::TempDir;

const RECIPE: &str = include_str!("../../../recipes/lossywav.json");

const WAF: &str = r#"#!/bin/sh
echo "waf $*" >> waf.log
case "$1" in
  configure) echo "checking for fftw3: ${BREWKIT_FEATURE_ENABLE_FFTW3:-no}" ;;
  build) [ -f fail-build ] && { echo "compilation failed" >&2; exit 1; }; echo "built" ;;
  install) mkdir -p "$PREFIX/bin" && : > "$PREFIX/bin/lossywav" ;;
esac
"#;

fn checkout() -> (TempDir, PathBuf) {
  let temp = TempDir::new().unwrap();
  let src = temp.path().join("lossywav");
  std::fs::create_dir_all(&src).unwrap();
  let waf = src.join("waf");
  std::fs::write(&waf, WAF).unwrap();
  std::fs::set_permissions(&waf, std::fs::Permissions::from_mode(0o755)).unwrap();
  (temp, src)
}

fn waf_log(src: &Path) -> Vec<String> {
  std::fs::read_to_string(src.join("waf.log"))
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

fn builder() -> EnvironmentBuilder {
  EnvironmentBuilder::new().inherit_path(true)
}

#[tokio::test]
async fn builds_and_installs_lossywav() {
  let (temp, src) = checkout();
  let prefix = temp.path().join("cellar").join("lossywav");
  let definition = PackageDefinition::from_json(RECIPE).unwrap();

  let result = Lifecycle::new(&src, ProcessRunner::new())
    .with_environment_builder(builder())
    .start(&definition, &prefix, &["enable-fftw3"])
    .await
    .unwrap();

  assert!(result.is_success(), "{:?}", result.error());
  assert_eq!(result.outcomes.len(), 3);
  assert_eq!(result.outcomes[0].output, "checking for fftw3: 1\n");
  assert_eq!(result.dependencies.runtime_closure(), &[Dependency::runtime("fftw")]);
  assert_eq!(
    waf_log(&src),
    vec![
      format!("waf configure --prefix={} --enable-fftw3", prefix.display()),
      "waf build".to_string(),
      "waf install".to_string(),
    ]
  );
  assert!(prefix.join("bin").join("lossywav").exists());
}

#[tokio::test]
async fn build_failure_stops_the_lifecycle() {
  let (temp, src) = checkout();
  std::fs::write(src.join("fail-build"), "").unwrap();
  let prefix = temp.path().join("cellar").join("lossywav");
  let definition = PackageDefinition::from_json(RECIPE).unwrap();

  let result = Lifecycle::new(&src, ProcessRunner::new())
    .with_environment_builder(builder())
    .start::<&str>(&definition, &prefix, &[])
    .await
    .unwrap();

  assert_eq!(result.failed_stage(), Some("build"));
  assert_eq!(result.exit_code(), 4);
  assert!(matches!(
    result.state,
    LifecycleState::Failed {
      during: StateKind::Building,
      reason: BuildError::StageExecutionFailure { exit_code: Some(1), .. },
      ..
    }
  ));
  assert_eq!(result.output, "compilation failed\n");
  assert_eq!(waf_log(&src).len(), 2);
  assert!(!prefix.join("bin").exists());
}

#[tokio::test]
async fn concurrent_builds_of_separate_checkouts() {
  let (temp_a, src_a) = checkout();
  let (temp_b, src_b) = checkout();
  std::fs::write(src_b.join("fail-build"), "").unwrap();
  let definition = PackageDefinition::from_json(RECIPE).unwrap();

  let jobs = vec![
    BuildJob::new(definition.clone(), &src_a, temp_a.path().join("prefix")),
    BuildJob::new(definition, &src_b, temp_b.path().join("prefix")),
  ];

  let results = run_many(jobs, Arc::new(ProcessRunner::new()), builder(), 2).await;

  assert!(results[0].as_ref().unwrap().is_success());
  assert_eq!(results[1].as_ref().unwrap().exit_code(), 4);
}
