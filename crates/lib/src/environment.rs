//! Build environment construction.
//!
//! Every build run gets a fresh [`Environment`]: the install prefix, the
//! enabled feature flags and the exact set of variables the build commands
//! see. Commands start from a cleared environment, so nothing from the
//! calling process leaks in unless the builder is told to pass it through.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::features::{FeatureSet, UnknownFeatureFlag, feature_env_var};
use crate::package::PackageDefinition;
use crate::template::TemplateVars;

/// Value of HOME when the caller's home directory is not passed through.
pub const ISOLATED_HOME: &str = "/homeless-shelter";

/// 1980-01-01T00:00:00Z, the ZIP epoch.
pub const SOURCE_DATE_EPOCH: &str = "315532800";

#[derive(Debug, Error)]
pub enum EnvironmentError {
  #[error(transparent)]
  UnknownFeatureFlag(#[from] UnknownFeatureFlag),

  #[error("install prefix is not valid UTF-8: {}", .0.display())]
  NonUtf8Prefix(PathBuf),

  #[error("install prefix must be an absolute path: {}", .0.display())]
  RelativePrefix(PathBuf),

  #[error("cannot build search path {var}: {message}")]
  SearchPath { var: &'static str, message: String },

  #[error("cannot create install prefix {}: {source}", .path.display())]
  CreatePrefix {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("install prefix is not writable {}: {source}", .path.display())]
  PrefixNotWritable {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// The process environment of one build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
  vars: BTreeMap<String, String>,
  prefix: PathBuf,
  prefix_str: String,
  flags: Vec<String>,
}

impl Environment {
  pub fn prefix(&self) -> &Path {
    &self.prefix
  }

  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }
}

impl TemplateVars for Environment {
  fn prefix(&self) -> &str {
    &self.prefix_str
  }

  /// Enabled feature flags, in order of first mention.
  fn flags(&self) -> &[String] {
    &self.flags
  }
}

/// Configurable construction of [`Environment`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentBuilder {
  search_prefixes: Vec<PathBuf>,
  inherit_path: bool,
  inherit_home: bool,
  extra: BTreeMap<String, String>,
}

impl EnvironmentBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Prefixes where dependencies are installed. Their `bin` and
  /// `lib/pkgconfig` directories are searched after the install prefix.
  pub fn with_search_prefixes<I, P>(mut self, prefixes: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.search_prefixes.extend(prefixes.into_iter().map(Into::into));
    self
  }

  /// Append the calling process's PATH after the build's own search path.
  pub fn inherit_path(mut self, inherit: bool) -> Self {
    self.inherit_path = inherit;
    self
  }

  /// Pass the calling process's HOME through instead of [`ISOLATED_HOME`].
  pub fn inherit_home(mut self, inherit: bool) -> Self {
    self.inherit_home = inherit;
    self
  }

  /// Set an additional variable. Variables derived from the prefix and the
  /// feature flags take precedence.
  pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.extra.insert(key.into(), value.into());
    self
  }

  /// Build the environment for one run of `definition`.
  ///
  /// The prefix is recorded verbatim. Flags outside the definition's
  /// recognized options are rejected. Whether the prefix exists or is
  /// writable is not checked here; see [`check_prefix`].
  pub fn build<S: AsRef<str>>(
    &self,
    definition: &PackageDefinition,
    prefix: &Path,
    flags: &[S],
  ) -> Result<Environment, EnvironmentError> {
    let flags = FeatureSet::of(definition).select(flags)?;

    let prefix_str = prefix
      .to_str()
      .ok_or_else(|| EnvironmentError::NonUtf8Prefix(prefix.to_path_buf()))?
      .to_string();

    let mut vars = BTreeMap::new();
    vars.insert("LANG".to_string(), "C".to_string());
    vars.insert("LC_ALL".to_string(), "C".to_string());
    vars.insert("SOURCE_DATE_EPOCH".to_string(), SOURCE_DATE_EPOCH.to_string());
    vars.insert("HOME".to_string(), self.home());
    vars.extend(self.extra.clone());

    vars.insert("PREFIX".to_string(), prefix_str.clone());
    vars.insert("PATH".to_string(), self.path_var(prefix)?);
    vars.insert("PKG_CONFIG_PATH".to_string(), self.pkg_config_var(prefix)?);
    vars.insert("BREWKIT_FEATURES".to_string(), flags.join(" "));
    for flag in &flags {
      vars.insert(feature_env_var(flag), "1".to_string());
    }

    debug!(
      package = %definition.name,
      prefix = %prefix_str,
      flags = ?flags,
      "built environment"
    );

    Ok(Environment {
      vars,
      prefix: prefix.to_path_buf(),
      prefix_str,
      flags,
    })
  }

  fn home(&self) -> String {
    match std::env::var("HOME") {
      Ok(home) if self.inherit_home => home,
      _ => ISOLATED_HOME.to_string(),
    }
  }

  fn path_var(&self, prefix: &Path) -> Result<String, EnvironmentError> {
    let mut entries: Vec<PathBuf> = std::iter::once(prefix)
      .chain(self.search_prefixes.iter().map(PathBuf::as_path))
      .map(|p| p.join("bin"))
      .collect();

    if self.inherit_path {
      if let Some(host) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&host));
      }
    }

    join_search_path("PATH", entries)
  }

  fn pkg_config_var(&self, prefix: &Path) -> Result<String, EnvironmentError> {
    let entries = std::iter::once(prefix)
      .chain(self.search_prefixes.iter().map(PathBuf::as_path))
      .map(|p| p.join("lib").join("pkgconfig"));

    join_search_path("PKG_CONFIG_PATH", entries)
  }
}

fn join_search_path<I>(var: &'static str, entries: I) -> Result<String, EnvironmentError>
where
  I: IntoIterator<Item = PathBuf>,
{
  let joined: OsString = std::env::join_paths(entries).map_err(|e| EnvironmentError::SearchPath {
    var,
    message: e.to_string(),
  })?;

  joined.into_string().map_err(|raw| EnvironmentError::SearchPath {
    var,
    message: format!("not valid UTF-8: {}", raw.to_string_lossy()),
  })
}

/// Build an environment with default builder settings.
pub fn build<S: AsRef<str>>(
  definition: &PackageDefinition,
  prefix: &Path,
  flags: &[S],
) -> Result<Environment, EnvironmentError> {
  EnvironmentBuilder::default().build(definition, prefix, flags)
}

/// Make sure the install prefix is absolute, exists and accepts new files.
pub fn check_prefix(prefix: &Path) -> Result<(), EnvironmentError> {
  if !prefix.is_absolute() {
    return Err(EnvironmentError::RelativePrefix(prefix.to_path_buf()));
  }

  std::fs::create_dir_all(prefix).map_err(|source| EnvironmentError::CreatePrefix {
    path: prefix.to_path_buf(),
    source,
  })?;

  tempfile::Builder::new()
    .prefix(".brewkit-probe")
    .tempfile_in(prefix)
    .map_err(|source| EnvironmentError::PrefixNotWritable {
      path: prefix.to_path_buf(),
      source,
    })?;

  Ok(())
}
