//! Package definitions.
//!
//! A [`PackageDefinition`] is the parsed form of a recipe: metadata, declared
//! dependencies, recognized feature options and the ordered build stages.
//! Definitions are loaded from JSON and validated before any build runs.

mod load;
mod types;

pub use load::DefinitionError;
pub use types::{
  BuildStage, Dependency, DependencyKind, FeatureOption, PackageDefinition, PackageHash, Phase, SourceLocations,
};
