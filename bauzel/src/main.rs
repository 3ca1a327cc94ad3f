//! Bauzel - zero-configuration incremental builds for C++ source trees
//!
//! Orchestrates the convenient-cxx engine:
//! 1. Configuration loading (optional `bauzel.yml` plus command-line switches)
//! 2. Source discovery
//! 3. Include extraction, dependency graph, closures, flags, timestamps
//! 4. Compiling stale objects and relinking changed executables

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bauzel=debug,convenient_cxx=debug"
    } else {
        "bauzel=info,convenient_cxx=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root = cli.directory.as_path();
    let options = cli.config_options();
    let result = match cli.command {
        None => commands::build::execute(root, &options, false),
        Some(Commands::Build { clean }) => commands::build::execute(root, &options, clean),
        Some(Commands::Clean) => commands::clean::execute(root, &options),
        Some(Commands::Deps { format }) => commands::deps::execute(root, &options, format),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
