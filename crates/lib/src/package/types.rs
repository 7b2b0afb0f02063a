use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Whether a dependency is needed only while building or also at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
  #[serde(rename = "build", alias = "build-only")]
  BuildOnly,
  #[serde(rename = "runtime")]
  Runtime,
}

impl DependencyKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      DependencyKind::BuildOnly => "build",
      DependencyKind::Runtime => "runtime",
    }
  }
}

impl fmt::Display for DependencyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
  pub name: String,
  #[serde(default = "default_dependency_kind")]
  pub kind: DependencyKind,
}

fn default_dependency_kind() -> DependencyKind {
  DependencyKind::Runtime
}

impl Dependency {
  pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
    Self {
      name: name.into(),
      kind,
    }
  }

  pub fn build(name: impl Into<String>) -> Self {
    Self::new(name, DependencyKind::BuildOnly)
  }

  pub fn runtime(name: impl Into<String>) -> Self {
    Self::new(name, DependencyKind::Runtime)
  }
}

/// The lifecycle phase a build stage belongs to.
///
/// Variants are ordered: stages of a definition must be declared with
/// non-decreasing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Configure,
  Build,
  Install,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::Configure => "configure",
      Phase::Build => "build",
      Phase::Install => "install",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One external command run as part of a build.
///
/// Arguments are templates: `{prefix}` expands to the install prefix and
/// `{flags}` to the enabled feature flag tokens. See [`crate::template`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildStage {
  pub name: String,
  pub phase: Phase,
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  /// Relative to the source checkout root.
  #[serde(default = "default_working_dir")]
  pub working_dir: PathBuf,
}

fn default_working_dir() -> PathBuf {
  PathBuf::from(".")
}

impl BuildStage {
  pub fn new(name: impl Into<String>, phase: Phase, program: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      phase,
      program: program.into(),
      args: Vec::new(),
      working_dir: default_working_dir(),
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = dir.into();
    self
  }

  /// The unexpanded command line, for display.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// A build-time option a package recognizes, e.g. `enable-fftw3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureOption {
  pub name: String,
  #[serde(default)]
  pub description: String,
}

impl FeatureOption {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocations {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub head: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageHash(pub String);

impl fmt::Display for PackageHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A parsed package recipe.
///
/// Definitions are plain data: the engine only ever reads them, so one
/// definition can be shared by any number of concurrent builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageDefinition {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage: Option<String>,
  #[serde(default)]
  pub source: SourceLocations,
  #[serde(default)]
  pub dependencies: Vec<Dependency>,
  #[serde(default)]
  pub options: Vec<FeatureOption>,
  #[serde(default)]
  pub stages: Vec<BuildStage>,
}

impl PackageDefinition {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: String::new(),
      homepage: None,
      source: SourceLocations::default(),
      dependencies: Vec::new(),
      options: Vec::new(),
      stages: Vec::new(),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
    self.homepage = Some(homepage.into());
    self
  }

  pub fn with_head(mut self, url: impl Into<String>) -> Self {
    self.source.head = Some(url.into());
    self
  }

  pub fn with_stable(mut self, url: impl Into<String>) -> Self {
    self.source.stable = Some(url.into());
    self
  }

  pub fn with_dependency(mut self, dependency: Dependency) -> Self {
    self.dependencies.push(dependency);
    self
  }

  pub fn with_option(mut self, option: FeatureOption) -> Self {
    self.options.push(option);
    self
  }

  pub fn with_stage(mut self, stage: BuildStage) -> Self {
    self.stages.push(stage);
    self
  }

  /// Content hash of the definition, stable across runs.
  pub fn compute_hash(&self) -> Result<PackageHash, serde_json::Error> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(PackageHash(format!("{:x}", hasher.finalize())))
  }
}
