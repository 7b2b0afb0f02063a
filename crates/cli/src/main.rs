mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

/// brewkit - build and install packages from declarative recipes
#[derive(Parser)]
#[command(name = "brewkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output (info logs, live build output)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build and install one or more packages
  Install {
    /// Recipe files (JSON package definitions)
    #[arg(required = true)]
    recipes: Vec<PathBuf>,

    /// Install prefix (only with a single recipe; default: <prefix root>/<name>)
    #[arg(long)]
    prefix: Option<PathBuf>,

    /// Source checkout (only with a single recipe; default: the recipe's directory)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Enable a feature flag the recipe declares (repeatable)
    #[arg(long = "flag", value_name = "FLAG")]
    flags: Vec<String>,

    /// Maximum number of packages built at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the resolved dependencies of a recipe
  Deps {
    /// Recipe file
    recipe: PathBuf,

    /// Also list build-only dependencies
    #[arg(long)]
    include_build: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List the feature flags a recipe recognizes
  Options {
    /// Recipe file
    recipe: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show a recipe's description, sources and stages
  Info {
    /// Recipe file
    recipe: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let code = match cli.command {
    Commands::Install {
      recipes,
      prefix,
      source,
      flags,
      jobs,
      output,
    } => cmd::cmd_install(
      cmd::InstallArgs {
        recipes,
        prefix,
        source,
        flags,
        jobs,
      },
      output,
      cli.verbose,
    )?,
    Commands::Deps {
      recipe,
      include_build,
      output,
    } => {
      cmd::cmd_deps(&recipe, include_build, output)?;
      0
    }
    Commands::Options { recipe, output } => {
      cmd::cmd_options(&recipe, output)?;
      0
    }
    Commands::Info { recipe, output } => {
      cmd::cmd_info(&recipe, output)?;
      0
    }
  };

  if code != 0 {
    std::process::exit(code);
  }
  Ok(())
}
