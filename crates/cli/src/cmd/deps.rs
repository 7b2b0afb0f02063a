use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use brewkit_lib::resolve::resolve;

use super::load_recipe;
use crate::output::{OutputFormat, print_info, print_json};

#[derive(Serialize)]
struct DepsOutput<'a> {
  package: &'a str,
  runtime: Vec<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  build: Option<Vec<&'a str>>,
}

pub fn cmd_deps(recipe: &Path, include_build: bool, output: OutputFormat) -> Result<()> {
  let definition = load_recipe(recipe)?;
  let deps = resolve(&definition).with_context(|| format!("Failed to resolve dependencies of {}", definition.name))?;

  let runtime: Vec<&str> = deps.runtime.iter().map(|d| d.name.as_str()).collect();
  let build: Vec<&str> = deps.build.iter().map(|d| d.name.as_str()).collect();

  if output.is_json() {
    return print_json(&DepsOutput {
      package: &definition.name,
      runtime,
      build: include_build.then_some(build),
    });
  }

  if runtime.is_empty() && (!include_build || build.is_empty()) {
    print_info(&format!("{} has no dependencies", definition.name));
    return Ok(());
  }

  for name in runtime {
    println!("{}", name);
  }
  if include_build {
    for name in build {
      println!("{} (build)", name);
    }
  }

  Ok(())
}
