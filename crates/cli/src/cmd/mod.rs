mod deps;
mod info;
mod install;
mod options;

use std::path::Path;

use anyhow::{Context, Result};
use brewkit_lib::package::PackageDefinition;

pub use deps::cmd_deps;
pub use info::cmd_info;
pub use install::{InstallArgs, cmd_install};
pub use options::cmd_options;

/// Read and validate a recipe file.
fn load_recipe(path: &Path) -> Result<PackageDefinition> {
  PackageDefinition::from_file(path).with_context(|| format!("Failed to load recipe: {}", path.display()))
}
