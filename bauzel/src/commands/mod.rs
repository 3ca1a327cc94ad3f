//! Bauzel command-line interface
//!
//! - `build`: compile and link every entry point that is out of date (default)
//! - `clean`: remove generated object files
//! - `deps`: show the inferred dependency graph and flags

use clap::{Parser, Subcommand, ValueEnum};
use convenient_cxx::ConfigOptions;
use std::path::PathBuf;

pub mod build;
pub mod clean;
pub mod deps;

/// Bauzel - build a C++ source tree without writing a build file
#[derive(Parser)]
#[command(name = "bauzel")]
#[command(about = "Zero-configuration incremental build tool for C++ source trees")]
#[command(version)]
pub struct Cli {
    /// Project root to build
    #[arg(short = 'C', long, default_value = ".", global = true)]
    pub directory: PathBuf,

    /// Show debug output, including every toolchain command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compiler driver to use instead of g++
    #[arg(long, global = true)]
    pub compiler: Option<String>,

    /// Language standard flag, e.g. `--std=-std=c++17`; empty to omit
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub std: Option<String>,

    /// Replace the warning flags with -w
    #[arg(long, global = true)]
    pub ignore_warnings: bool,

    /// Define NO_GPL for every compile
    #[arg(long, global = true)]
    pub no_gpl: bool,

    /// Print every header-scanning command
    #[arg(long, global = true)]
    pub show_header_scanning: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Toolchain switches given on the command line.
    pub fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            compiler: self.compiler.clone(),
            std: self.std.clone(),
            ignore_warnings: self.ignore_warnings,
            no_gpl: self.no_gpl,
            show_header_scanning: self.show_header_scanning,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Compile and link out-of-date entry points
    Build {
        /// Remove object files once the build succeeds
        #[arg(long)]
        clean: bool,
    },

    /// Remove generated object files
    Clean,

    /// Show dependencies, closures and flags of every source
    Deps {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

/// Output format of the `deps` command.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Indented listing
    Text,
    /// JSON document
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command() {
        let cli = Cli::try_parse_from(["bauzel"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.directory, PathBuf::from("."));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_switches() {
        let cli = Cli::try_parse_from([
            "bauzel",
            "-C",
            "demo",
            "--compiler",
            "clang++",
            "--std",
            "-std=c++20",
            "--ignore-warnings",
            "build",
            "--clean",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Build { clean: true }));
        let options = cli.config_options();
        assert_eq!(options.compiler.as_deref(), Some("clang++"));
        assert_eq!(options.std.as_deref(), Some("-std=c++20"));
        assert!(options.ignore_warnings);
        assert!(!options.no_gpl);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["bauzel", "deps", "--format", "json", "-v", "--no-gpl"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Deps { format: Format::Json }));
        assert!(cli.verbose);
        assert!(cli.no_gpl);
    }
}
