//! Incremental build engine for C++ source trees without a project file
//!
//! The dependency structure is inferred from the sources themselves:
//!
//! 1. **Discovery** ([`Project::discover`]): implementation files, headers and entry points
//! 2. **Include extraction** ([`IncludeScan`]): full header closure per file, from the preprocessor
//! 3. **Graph building** ([`SourceGraph`]): project headers mapped to implementation files
//! 4. **Closures** ([`ClosureTable`]): everything needed to link each file
//! 5. **Flag propagation** ([`FlagTable`]): comment directives and header signatures
//! 6. **Staleness** ([`Timestamps`]): effective mtime per file
//! 7. **Orchestration** ([`build`]): compile stale objects, relink changed executables
//!
//! Stages 2 to 6 run once, in order, and are bundled into an immutable
//! [`BuildContext`].
//!
//! # Example
//!
//! ```no_run
//! use convenient_cxx::{
//!     BuildContext, ConfigOptions, GccToolchain, Project, StemCorrespondence, ToolchainConfig, build,
//! };
//! use std::path::Path;
//!
//! # fn main() -> convenient_cxx::Result<()> {
//! let root = Path::new(".");
//! let config = ToolchainConfig::load(root, &ConfigOptions::default())?;
//! let project = Project::discover(root, &config)?;
//! let toolchain = GccToolchain::new(root, &config);
//!
//! let context = BuildContext::analyze(project, &config, &toolchain, &StemCorrespondence::from_config(&config))?;
//! let report = build(&context, &toolchain)?;
//! println!("compiled {} files", report.compiled.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod clean;
pub mod closure;
pub mod config;
pub mod context;
pub mod correspondence;
pub mod error;
pub mod flags;
pub mod graph;
pub mod includes;
pub mod orchestrator;
pub mod project;
pub mod staleness;
pub mod summary;
pub mod toolchain;

pub use clean::{CleanReport, clean};
pub use closure::{ClosureTable, close_over};
pub use config::{CONFIG_FILE_NAME, ConfigFile, ConfigOptions, ToolchainConfig};
pub use context::BuildContext;
pub use correspondence::{CorrespondenceResolver, ExplicitCorrespondence, StemCorrespondence};
pub use error::{BuildError, Result};
pub use flags::{DirectiveScope, Directives, FileFlags, FlagSet, FlagTable, HeaderFlags};
pub use graph::{Localized, SourceGraph, localize};
pub use includes::{IncludeScan, parse_dependency_listing};
pub use orchestrator::{BuildReport, build};
pub use project::{Project, SourceFile};
pub use staleness::{Timestamp, Timestamps, executable_path, object_path};
pub use summary::{DependencySummary, FileSummary};
pub use toolchain::{GccToolchain, Toolchain};
