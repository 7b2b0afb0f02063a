//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding a source checkout with
/// the recipe and a fake `waf`, plus isolated config and data directories.
pub struct TestEnv {
  pub temp: TempDir,
  pub recipe_path: PathBuf,
}

impl TestEnv {
  /// Create a checkout from a recipe fixture, with the fake `waf` next to it.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self {
      recipe_path: temp.path().join("src").join(name),
      temp,
    };
    env.write_file(&format!("src/{}", name), &fixture_content(name));
    env.install_waf();
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  #[cfg(unix)]
  fn install_waf(&self) {
    use std::os::unix::fs::PermissionsExt;

    let waf = self.source_path().join("waf");
    std::fs::write(&waf, fixture_content("waf")).unwrap();
    std::fs::set_permissions(&waf, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  #[cfg(not(unix))]
  fn install_waf(&self) {}

  /// Source checkout containing the recipe.
  pub fn source_path(&self) -> PathBuf {
    let p = self.temp.path().join("src");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Explicit install prefix for tests that pass `--prefix`.
  pub fn prefix_path(&self) -> PathBuf {
    self.temp.path().join("prefix")
  }

  /// Data path; default prefixes land in `<data>/brewkit/cellar/<name>`.
  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn config_path(&self) -> PathBuf {
    let p = self.temp.path().join("config");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Lines the fake `waf` recorded, one per invocation.
  pub fn waf_log(&self) -> Vec<String> {
    read_lines(&self.source_path().join("waf.log"))
  }

  /// Get a pre-configured Command for the brewkit binary.
  ///
  /// Config and data directories point into the temp dir and every
  /// `BREWKIT_*` variable of the calling environment is removed.
  pub fn brewkit_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("brewkit");
    cmd.env("XDG_CONFIG_HOME", self.config_path());
    cmd.env("XDG_DATA_HOME", self.data_path());
    for var in [
      "BREWKIT_PREFIX",
      "BREWKIT_SOURCE_ROOT",
      "BREWKIT_SEARCH_PATH",
      "BREWKIT_PARALLELISM",
      "BREWKIT_INHERIT_PATH",
      "RUST_LOG",
    ] {
      cmd.env_remove(var);
    }
    cmd
  }
}

fn read_lines(path: &Path) -> Vec<String> {
  match std::fs::read_to_string(path) {
    Ok(content) => content.lines().map(str::to_string).collect(),
    Err(_) => Vec::new(),
  }
}
