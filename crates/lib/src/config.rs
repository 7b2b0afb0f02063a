//! User configuration.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. `$XDG_CONFIG_HOME/brewkit/config.json`
//! 3. `BREWKIT_*` environment variables
//!
//! Command line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CELLAR_DIR_NAME, CONFIG_FILE_NAME};
use crate::environment::EnvironmentBuilder;
use crate::platform::paths;

pub const ENV_PREFIX: &str = "BREWKIT_PREFIX";
pub const ENV_SOURCE_ROOT: &str = "BREWKIT_SOURCE_ROOT";
pub const ENV_SEARCH_PATH: &str = "BREWKIT_SEARCH_PATH";
pub const ENV_PARALLELISM: &str = "BREWKIT_PARALLELISM";
pub const ENV_INHERIT_PATH: &str = "BREWKIT_INHERIT_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid value for {var}: '{value}' ({message})")]
  InvalidVar {
    var: &'static str,
    value: String,
    message: String,
  },

  #[error("no install prefix configured and no home directory to derive one from")]
  NoPrefixRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Directory holding one prefix per package (`<prefix_root>/<name>`).
  pub prefix_root: Option<PathBuf>,
  /// Source checkout used when none is given on the command line.
  pub source_root: Option<PathBuf>,
  /// Prefixes of installed dependencies, searched after the package's own.
  pub search_paths: Vec<PathBuf>,
  pub parallelism: usize,
  pub inherit_path: bool,
  pub inherit_home: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      prefix_root: None,
      source_root: None,
      search_paths: Vec::new(),
      parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      inherit_path: true,
      inherit_home: false,
    }
  }
}

impl Config {
  /// Location of the user config file, if a config directory can be determined.
  pub fn default_path() -> Option<PathBuf> {
    paths::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
  }

  /// Load defaults, the user config file and the environment.
  pub fn load() -> Result<Self, ConfigError> {
    let config = match Self::default_path() {
      Some(path) => Self::from_file_or_default(&path)?,
      None => Self::default(),
    };
    config.with_env()
  }

  /// Read a config file; a missing file yields the defaults.
  pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      debug!(path = %path.display(), "no config file, using defaults");
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    debug!(path = %path.display(), "loaded config file");
    Ok(config)
  }

  /// Apply `BREWKIT_*` environment variables over this config.
  pub fn with_env(mut self) -> Result<Self, ConfigError> {
    if let Some(prefix) = env_var(ENV_PREFIX) {
      self.prefix_root = Some(PathBuf::from(prefix));
    }
    if let Some(source) = env_var(ENV_SOURCE_ROOT) {
      self.source_root = Some(PathBuf::from(source));
    }
    if let Some(search) = std::env::var_os(ENV_SEARCH_PATH) {
      self.search_paths = std::env::split_paths(&search)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    }
    if let Some(value) = env_var(ENV_PARALLELISM) {
      self.parallelism = parse_parallelism(&value)?;
    }
    if let Some(value) = env_var(ENV_INHERIT_PATH) {
      self.inherit_path = parse_bool(ENV_INHERIT_PATH, &value)?;
    }
    Ok(self)
  }

  /// Directory packages get their prefixes in.
  pub fn prefix_root(&self) -> Result<PathBuf, ConfigError> {
    match &self.prefix_root {
      Some(root) => Ok(root.clone()),
      None => paths::data_dir()
        .map(|dir| dir.join(CELLAR_DIR_NAME))
        .ok_or(ConfigError::NoPrefixRoot),
    }
  }

  /// Default install prefix of `package`.
  pub fn prefix_for(&self, package: &str) -> Result<PathBuf, ConfigError> {
    Ok(self.prefix_root()?.join(package))
  }

  pub fn environment_builder(&self) -> EnvironmentBuilder {
    EnvironmentBuilder::new()
      .with_search_prefixes(self.search_paths.iter().cloned())
      .inherit_path(self.inherit_path)
      .inherit_home(self.inherit_home)
  }
}

fn env_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_parallelism(value: &str) -> Result<usize, ConfigError> {
  match value.trim().parse::<usize>() {
    Ok(0) => Err(ConfigError::InvalidVar {
      var: ENV_PARALLELISM,
      value: value.to_string(),
      message: "must be at least 1".to_string(),
    }),
    Ok(n) => Ok(n),
    Err(e) => Err(ConfigError::InvalidVar {
      var: ENV_PARALLELISM,
      value: value.to_string(),
      message: e.to_string(),
    }),
  }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::InvalidVar {
      var,
      value: value.to_string(),
      message: "expected true or false".to_string(),
    }),
  }
}
