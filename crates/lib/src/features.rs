//! Feature flag handling.
//!
//! A package declares the build-time options it recognizes:
//!
//! ```text
//! "options": [
//!   { "name": "enable-fftw3", "description": "link against FFTW3 for transform acceleration" }
//! ]
//! ```
//!
//! Requested flags are checked against that set before a build starts.

use std::collections::HashSet;

use thiserror::Error;

use crate::package::{FeatureOption, PackageDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature flag '{flag}' for {package} (recognized: {})", display_recognized(.recognized))]
pub struct UnknownFeatureFlag {
  pub flag: String,
  pub package: String,
  pub recognized: Vec<String>,
}

fn display_recognized(recognized: &[String]) -> String {
  if recognized.is_empty() {
    "none".to_string()
  } else {
    recognized.join(", ")
  }
}

/// The feature flags a package recognizes.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSet<'a> {
  package: &'a str,
  options: &'a [FeatureOption],
}

impl<'a> FeatureSet<'a> {
  pub fn of(definition: &'a PackageDefinition) -> Self {
    Self {
      package: &definition.name,
      options: &definition.options,
    }
  }

  pub fn has(&self, name: &str) -> bool {
    self.options.iter().any(|o| o.name == name)
  }

  pub fn names(&self) -> Vec<String> {
    self.options.iter().map(|o| o.name.clone()).collect()
  }

  pub fn options(&self) -> &'a [FeatureOption] {
    self.options
  }

  /// Check requested flags against the recognized set.
  ///
  /// Returns the flags in order of first mention with duplicates removed.
  /// A leading `--` is accepted and stripped, so `--enable-fftw3` and
  /// `enable-fftw3` name the same flag.
  pub fn select<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>, UnknownFeatureFlag> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for flag in requested {
      let flag = normalize(flag.as_ref());
      if !self.has(flag) {
        return Err(UnknownFeatureFlag {
          flag: flag.to_string(),
          package: self.package.to_string(),
          recognized: self.names(),
        });
      }
      if seen.insert(flag) {
        selected.push(flag.to_string());
      }
    }

    Ok(selected)
  }
}

fn normalize(flag: &str) -> &str {
  let flag = flag.trim();
  flag.strip_prefix("--").unwrap_or(flag)
}

/// Environment variable announcing an enabled flag to build scripts,
/// e.g. `enable-fftw3` becomes `BREWKIT_FEATURE_ENABLE_FFTW3`.
pub fn feature_env_var(flag: &str) -> String {
  let suffix: String = flag
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect();
  format!("BREWKIT_FEATURE_{suffix}")
}
