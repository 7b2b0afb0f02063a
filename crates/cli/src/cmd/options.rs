use std::path::Path;

use anyhow::Result;

use brewkit_lib::features::FeatureSet;
use brewkit_lib::template::flag_token;

use super::load_recipe;
use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_options(recipe: &Path, output: OutputFormat) -> Result<()> {
  let definition = load_recipe(recipe)?;
  let options = FeatureSet::of(&definition).options();

  if output.is_json() {
    return print_json(&options);
  }

  if options.is_empty() {
    print_info(&format!("{} declares no feature flags", definition.name));
    return Ok(());
  }

  let width = options.iter().map(|o| o.name.len() + 2).max().unwrap_or(0);
  for option in options {
    println!("{:<width$}  {}", flag_token(&option.name), option.description);
  }

  Ok(())
}
