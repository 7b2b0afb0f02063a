//! End-to-end `brewkit install` tests.

use predicates::prelude::*;
use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn install_runs_all_stages_in_order() {
  let env = TestEnv::from_fixture("lossywav.json");
  let prefix = env.prefix_path();

  env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(&prefix)
    .args(["--flag", "enable-fftw3"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Installed lossywav"))
    .stdout(predicate::str::contains("Runtime dependencies: fftw"));

  assert_eq!(
    env.waf_log(),
    vec![
      format!("waf configure --prefix={} --enable-fftw3", prefix.display()),
      "waf build".to_string(),
      "waf install".to_string(),
    ]
  );
  assert!(prefix.join("bin").join("lossywav").exists());
}

#[test]
#[serial]
fn install_without_flags_passes_no_flag_arguments() {
  let env = TestEnv::from_fixture("lossywav.json");
  let prefix = env.prefix_path();

  env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(&prefix)
    .assert()
    .success();

  assert_eq!(env.waf_log()[0], format!("waf configure --prefix={}", prefix.display()));
}

#[test]
#[serial]
fn default_prefix_is_under_data_dir() {
  let env = TestEnv::from_fixture("lossywav.json");

  env.brewkit_cmd().arg("install").arg(&env.recipe_path).assert().success();

  let prefix = env.data_path().join("brewkit").join("cellar").join("lossywav");
  assert!(prefix.join("bin").join("lossywav").exists());
}

#[test]
#[serial]
fn prefix_root_from_environment() {
  let env = TestEnv::from_fixture("lossywav.json");
  let root = env.temp.path().join("opt");

  env
    .brewkit_cmd()
    .env("BREWKIT_PREFIX", &root)
    .arg("install")
    .arg(&env.recipe_path)
    .assert()
    .success();

  assert!(root.join("lossywav").join("bin").join("lossywav").exists());
}

#[test]
#[serial]
fn failing_build_stage_exits_with_building_code() {
  let env = TestEnv::from_fixture("lossywav.json");
  env.write_file("src/fail-build", "");

  env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .assert()
    .code(4)
    .stderr(predicate::str::contains("waf: compilation failed"))
    .stderr(predicate::str::contains("stage 'build' failed (exit code 1)"));

  assert_eq!(env.waf_log().len(), 2, "install must not run after a failed build");
  assert!(!env.prefix_path().join("bin").exists());
}

#[test]
#[serial]
fn unknown_flag_exits_before_any_stage() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .args(["--flag", "unsupported-flag"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("unknown feature flag 'unsupported-flag'"));

  assert!(env.waf_log().is_empty());
}

#[test]
#[serial]
fn json_output_describes_the_build() {
  let env = TestEnv::from_fixture("lossywav.json");

  let output = env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .args(["--flag", "enable-fftw3", "-o", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["package"], "lossywav");
  assert_eq!(json["outcome"], "succeeded");
  assert_eq!(json["state"]["state"], "done");
  assert_eq!(json["outcomes"].as_array().unwrap().len(), 3);
  assert_eq!(json["outcomes"][0]["output"], format!("configured: configure --prefix={} --enable-fftw3\n", env.prefix_path().display()));
  assert_eq!(json["dependencies"]["runtime"][0]["name"], "fftw");
}

#[test]
#[serial]
fn json_output_of_failed_build_has_reason() {
  let env = TestEnv::from_fixture("lossywav.json");
  env.write_file("src/fail-build", "");

  let output = env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .args(["-o", "json"])
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(4));
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["outcome"], "failed");
  assert_eq!(json["state"]["state"], "failed");
  assert_eq!(json["state"]["stage"], "build");
  assert_eq!(json["state"]["reason"]["kind"], "stage_execution_failure");
  assert_eq!(json["state"]["reason"]["exit_code"], 1);
  assert_eq!(json["exit_status"], 1);
}

#[test]
#[serial]
fn multiple_recipes_build_independently() {
  let env = TestEnv::from_fixture("lossywav.json");
  env.write_file("other/plain.json", &super::common::fixture_content("plain.json"));
  let root = env.temp.path().join("opt");

  env
    .brewkit_cmd()
    .env("BREWKIT_PREFIX", &root)
    .arg("install")
    .arg(&env.recipe_path)
    .arg(env.temp.path().join("other").join("plain.json"))
    .args(["--jobs", "2"])
    .assert()
    .success();

  assert!(root.join("lossywav").join("bin").join("lossywav").exists());
  assert!(root.join("plain").join("plain.txt").exists());
}

#[test]
#[serial]
fn prefix_with_multiple_recipes_is_rejected() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("install")
    .arg(&env.recipe_path)
    .arg(&env.recipe_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("only be used with a single recipe"));
}
