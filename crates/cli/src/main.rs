use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sebs_lib::platform::Arch;
use sebs_lib::types::{InputSize, Language};

mod cmd;
mod output;

use cmd::{BuildArgs, PrepareArgs, Workspace};
use output::{OutputFormat, print_error};

#[derive(Parser)]
#[command(name = "sebs")]
#[command(author, version, about = "Build and cache serverless benchmark packages", long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Cache root (default: $SEBS_CACHE or ~/.cache/sebs)
  #[arg(long, global = true)]
  cache: Option<PathBuf>,

  /// Benchmark source tree (default: $SEBS_BENCHMARKS or ./benchmarks)
  #[arg(long, global = true)]
  benchmarks: Option<PathBuf>,

  /// Deployment wrapper tree (default: $SEBS_WRAPPERS or <benchmarks>/wrappers)
  #[arg(long, global = true)]
  wrappers: Option<PathBuf>,

  /// Deployment systems description
  #[arg(long, global = true, default_value = "config/systems.json")]
  systems: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a benchmark package, reusing the cached one when sources are unchanged
  Build {
    /// Benchmark name (e.g. 110.dynamic-html)
    benchmark: String,

    /// Target deployment
    #[arg(short, long, default_value = "local")]
    deployment: String,

    /// Benchmark language
    #[arg(short, long, default_value = "python")]
    language: Language,

    /// Language runtime version
    #[arg(long, default_value = "3.9")]
    language_version: String,

    /// Target architecture (default: host)
    #[arg(long)]
    arch: Option<Arch>,

    /// Rebuild even if the cached package is valid
    #[arg(short, long)]
    force: bool,

    /// Do not install dependencies in a builder container
    #[arg(long)]
    no_docker: bool,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Inspect the artifact cache
  Cache {
    #[command(subcommand)]
    command: CacheCommands,
  },

  /// Read or change cached provider configuration
  Config {
    #[command(subcommand)]
    command: ConfigCommands,
  },

  /// Generate benchmark input and upload its data
  Prepare {
    /// Benchmark name
    benchmark: String,

    /// Target deployment
    #[arg(short, long, default_value = "local")]
    deployment: String,

    /// Input size
    #[arg(short, long, default_value = "test")]
    size: InputSize,

    /// Directory holding benchmark input data
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Local object storage root (default: <cache>/storage)
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

#[derive(Subcommand)]
enum CacheCommands {
  /// List cached benchmarks
  List {
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Show everything cached for one benchmark
  Show {
    benchmark: String,

    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

#[derive(Subcommand)]
enum ConfigCommands {
  /// Print the cached configuration of a deployment
  Get { deployment: String },

  /// Set a value at a dotted key path (the value is parsed as JSON, else taken as a string)
  Set {
    deployment: String,
    key: String,
    value: String,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let workspace = Workspace::resolve(cli.cache, cli.benchmarks, cli.wrappers, cli.systems);
  debug!(
    cache = %workspace.cache.display(),
    benchmarks = %workspace.build.benchmarks.display(),
    staging = %workspace.build.build.display(),
    "resolved workspace"
  );

  let result = match cli.command {
    Commands::Build {
      benchmark,
      deployment,
      language,
      language_version,
      arch,
      force,
      no_docker,
      output,
    } => cmd::cmd_build(
      &workspace,
      BuildArgs {
        benchmark,
        deployment,
        language,
        language_version,
        arch,
        force,
        no_docker,
      },
      output,
    ),
    Commands::Cache { command } => match command {
      CacheCommands::List { output } => cmd::cmd_cache_list(&workspace, output),
      CacheCommands::Show { benchmark, output } => cmd::cmd_cache_show(&workspace, &benchmark, output),
    },
    Commands::Config { command } => match command {
      ConfigCommands::Get { deployment } => cmd::cmd_config_get(&workspace, &deployment),
      ConfigCommands::Set { deployment, key, value } => cmd::cmd_config_set(&workspace, &deployment, &key, &value),
    },
    Commands::Prepare {
      benchmark,
      deployment,
      size,
      data_dir,
      storage_dir,
      output,
    } => cmd::cmd_prepare(
      &workspace,
      PrepareArgs {
        benchmark,
        deployment,
        size,
        data_dir,
        storage_dir,
      },
      output,
    ),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
