//! Error types for the build engine

use convenient_graph::GraphError;
use std::path::PathBuf;

/// Everything that can abort a build run.
///
/// There is no degraded mode: any of these stops the pipeline, leaving
/// artifacts produced earlier in the run on disk as they are.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A source or configuration file could not be read
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    /// A source file is not valid UTF-8
    #[error("Error decoding {0} as UTF-8, ensure the file is saved with UTF-8 encoding")]
    Decode(PathBuf),

    /// The toolchain binary could not be started
    #[error("Command not found: {program}")]
    ToolchainMissing {
        /// Program that was invoked
        program: String,
    },

    /// The toolchain ran but reported failure
    #[error("Command failed ({status}): {command}\n{stderr}")]
    Toolchain {
        /// Rendered command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured diagnostic output
        stderr: String,
    },

    /// A flag directive in a source comment could not be tokenized
    #[error("Invalid directive in {path}: {message}")]
    Directive {
        /// File containing the directive
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// The project configuration file is malformed
    #[error("Invalid configuration in {0}: {1}")]
    Config(PathBuf, String),

    /// Walking the source tree failed
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A file expected in the build context was never discovered
    #[error("Unknown source file: {0}")]
    UnknownFile(PathBuf),

    /// Dependency graph inconsistency
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
