//! Dependency resolution.
//!
//! Partitions a definition's declared dependencies into build-time and
//! runtime sets. Names are the identity of a dependency: a name declared more
//! than once collapses to a single entry of the most restrictive kind, so a
//! dependency needed at runtime is never dropped after the build.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::package::{Dependency, DependencyKind, PackageDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// Two declarations of the same name whose kinds cannot be merged.
  ///
  /// The two-kind model always reconciles (runtime wins), so this is only
  /// reachable once richer dependency kinds exist.
  #[error("dependency '{name}' declared as both {first} and {second}")]
  DuplicateDependencyConflict {
    name: String,
    first: DependencyKind,
    second: DependencyKind,
  },
}

/// Output of [`resolve`]: two disjoint, ordered dependency lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedDeps {
  pub build: Vec<Dependency>,
  pub runtime: Vec<Dependency>,
}

impl ResolvedDeps {
  /// Every resolved name, build dependencies first.
  pub fn names(&self) -> Vec<&str> {
    self
      .build
      .iter()
      .chain(&self.runtime)
      .map(|d| d.name.as_str())
      .collect()
  }

  /// The dependencies that must stay installed alongside the package.
  pub fn runtime_closure(&self) -> &[Dependency] {
    &self.runtime
  }

  pub fn is_empty(&self) -> bool {
    self.build.is_empty() && self.runtime.is_empty()
  }
}

/// Merge two declared kinds of the same dependency, `None` if they conflict.
///
/// New kinds that cannot be ordered against the existing ones return `None`.
fn merge_kinds(first: DependencyKind, second: DependencyKind) -> Option<DependencyKind> {
  use DependencyKind::*;

  match (first, second) {
    (Runtime, _) | (_, Runtime) => Some(Runtime),
    (BuildOnly, BuildOnly) => Some(BuildOnly),
  }
}

/// Resolve a definition's dependency list.
///
/// Order within each output list follows the first declaration of each name.
pub fn resolve(definition: &PackageDefinition) -> Result<ResolvedDeps, ResolveError> {
  let mut merged: Vec<Dependency> = Vec::with_capacity(definition.dependencies.len());
  let mut index: HashMap<&str, usize> = HashMap::new();

  for dep in &definition.dependencies {
    match index.get(dep.name.as_str()) {
      Some(&pos) => {
        let existing = &mut merged[pos];
        let (first, second) = (existing.kind, dep.kind);
        let kind = merge_kinds(first, second).ok_or_else(|| ResolveError::DuplicateDependencyConflict {
          name: dep.name.clone(),
          first,
          second,
        })?;
        if kind != existing.kind {
          debug!(dependency = %dep.name, from = %existing.kind, to = %kind, "promoting duplicate dependency");
        }
        existing.kind = kind;
      }
      None => {
        index.insert(dep.name.as_str(), merged.len());
        merged.push(dep.clone());
      }
    }
  }

  let (build, runtime) = merged.into_iter().partition(|d| d.kind == DependencyKind::BuildOnly);

  Ok(ResolvedDeps { build, runtime })
}
