//! Tests for the read-only commands: `deps`, `options` and `info`.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_path};

#[test]
fn deps_lists_runtime_dependencies() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("deps")
    .arg(fixture_path("lossywav.json"))
    .assert()
    .success()
    .stdout(predicate::eq("fftw\n"));
}

#[test]
fn deps_include_build() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("deps")
    .arg(fixture_path("lossywav.json"))
    .arg("--include-build")
    .assert()
    .success()
    .stdout(predicate::eq("fftw\npkg-config (build)\n"));
}

#[test]
fn deps_json() {
  let env = TestEnv::from_fixture("lossywav.json");

  let output = env
    .brewkit_cmd()
    .arg("deps")
    .arg(fixture_path("lossywav.json"))
    .args(["-o", "json"])
    .output()
    .unwrap();

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json, serde_json::json!({ "package": "lossywav", "runtime": ["fftw"] }));
}

#[test]
fn options_lists_recognized_flags() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("options")
    .arg(fixture_path("lossywav.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("--enable-fftw3"))
    .stdout(predicate::str::contains("link against FFTW3 for transform acceleration"));
}

#[test]
fn options_for_recipe_without_options() {
  let env = TestEnv::from_fixture("plain.json");

  env
    .brewkit_cmd()
    .arg("options")
    .arg(fixture_path("plain.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("plain declares no feature flags"));
}

#[test]
fn info_shows_recipe_details() {
  let env = TestEnv::from_fixture("lossywav.json");

  env
    .brewkit_cmd()
    .arg("info")
    .arg(fixture_path("lossywav.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("lossywav: POSIX port of lossyWAV"))
    .stdout(predicate::str::contains("https://github.com/MoSal/lossywav-for-posix.git"))
    .stdout(predicate::str::contains("pkg-config (build), fftw"))
    .stdout(predicate::str::contains("./waf configure --prefix={prefix} {flags}"));
}

#[test]
fn info_json_includes_hash() {
  let env = TestEnv::from_fixture("lossywav.json");

  let output = env
    .brewkit_cmd()
    .arg("info")
    .arg(fixture_path("lossywav.json"))
    .args(["-o", "json"])
    .output()
    .unwrap();

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["name"], "lossywav");
  assert_eq!(json["stages"].as_array().unwrap().len(), 3);
  assert_eq!(json["hash"].as_str().unwrap().len(), 64);
}

#[test]
fn invalid_recipe_is_reported() {
  let env = TestEnv::from_fixture("lossywav.json");
  env.write_file("broken.json", r#"{ "name": "", "stages": [] }"#);

  env
    .brewkit_cmd()
    .arg("info")
    .arg(env.temp.path().join("broken.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load recipe"));
}
