use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use brewkit_lib::package::{DependencyKind, PackageDefinition};

use super::load_recipe;
use crate::output::{OutputFormat, print_json, print_stat, symbols};

#[derive(Serialize)]
struct InfoOutput<'a> {
  #[serde(flatten)]
  definition: &'a PackageDefinition,
  hash: String,
}

pub fn cmd_info(recipe: &Path, output: OutputFormat) -> Result<()> {
  let definition = load_recipe(recipe)?;
  let hash = definition.compute_hash().context("Failed to hash recipe")?;

  if output.is_json() {
    return print_json(&InfoOutput {
      definition: &definition,
      hash: hash.0,
    });
  }

  if definition.description.is_empty() {
    println!("{}", definition.name);
  } else {
    println!("{}: {}", definition.name, definition.description);
  }

  if let Some(homepage) = &definition.homepage {
    print_stat("Homepage", homepage);
  }
  if let Some(head) = &definition.source.head {
    print_stat("Head", head);
  }
  if let Some(stable) = &definition.source.stable {
    print_stat("Stable", stable);
  }
  print_stat("Hash", &hash.0[..12]);

  if !definition.dependencies.is_empty() {
    let deps: Vec<String> = definition
      .dependencies
      .iter()
      .map(|d| match d.kind {
        DependencyKind::BuildOnly => format!("{} (build)", d.name),
        DependencyKind::Runtime => d.name.clone(),
      })
      .collect();
    print_stat("Dependencies", &deps.join(", "));
  }

  if !definition.options.is_empty() {
    let names: Vec<&str> = definition.options.iter().map(|o| o.name.as_str()).collect();
    print_stat("Options", &names.join(", "));
  }

  if !definition.stages.is_empty() {
    println!();
    println!("Stages:");
    for stage in &definition.stages {
      println!(
        "  {} [{}] {} {}",
        stage.name,
        stage.phase,
        symbols::ARROW,
        stage.command_line()
      );
    }
  }

  Ok(())
}
