//! Timestamp bookkeeping and rebuild decisions
//!
//! Every source gets an effective timestamp: the newest of its own mtime,
//! the configuration mtime and the mtimes of the project headers it pulls in.
//! The include scan already reports the transitive header closure, so a
//! nested header edit is visible here without walking the graph again.

use crate::config::ToolchainConfig;
use crate::graph::SourceGraph;
use crate::project::Project;
use crate::{BuildError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Point in time used to order staleness.
///
/// A missing file has the minimum timestamp, older than any real mtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Option<SystemTime>);

impl Timestamp {
    /// Timestamp of a file that does not exist.
    pub const MISSING: Self = Self(None);

    /// Wrap a concrete point in time.
    #[must_use]
    pub fn at(time: SystemTime) -> Self {
        Self(Some(time))
    }

    /// Modification time of `path`, or [`Timestamp::MISSING`] if it cannot be read.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_or(Self::MISSING, Self::at)
    }

    /// Whether this is the missing-file timestamp.
    #[must_use]
    pub fn is_missing(self) -> bool {
        self.0.is_none()
    }
}

/// Object file for a source: `dir/stem.cpp` becomes `dir/.stem.o`.
#[must_use]
pub fn object_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!(".{stem}.o"))
}

/// Executable for an entry point: the source path without its extension.
#[must_use]
pub fn executable_path(entry: &Path) -> PathBuf {
    entry.with_extension("")
}

/// Effective timestamps for every implementation file.
#[derive(Debug, Clone, Default)]
pub struct Timestamps {
    effective: BTreeMap<PathBuf, Timestamp>,
}

impl Timestamps {
    /// Read the filesystem and compute the effective timestamp of each source.
    ///
    /// Header mtimes are read once and shared across sources.
    #[must_use]
    pub fn compute(project: &Project, graph: &SourceGraph, config: &ToolchainConfig) -> Self {
        let root = project.root();
        let headers: BTreeMap<&Path, Timestamp> = project
            .headers()
            .iter()
            .map(|header| (header.as_path(), Timestamp::of(&root.join(header))))
            .collect();

        let mut effective = BTreeMap::new();
        for source in project.sources() {
            let mut latest = Timestamp::of(&root.join(&source.path)).max(config.config_time);
            for header in graph.local_headers(&source.path) {
                if let Some(&time) = headers.get(header.as_path()) {
                    latest = latest.max(time);
                }
            }
            debug!("Effective timestamp of {}: {:?}", source.path.display(), latest);
            let _ = effective.insert(source.path.clone(), latest);
        }

        Self { effective }
    }

    /// Effective timestamp of a source.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the source was not discovered.
    pub fn effective(&self, source: &Path) -> Result<Timestamp> {
        self.effective
            .get(source)
            .copied()
            .ok_or_else(|| BuildError::UnknownFile(source.to_path_buf()))
    }
}

/// An object is stale when it is missing or strictly older than its inputs.
#[must_use]
pub fn object_is_stale(object: Timestamp, effective: Timestamp) -> bool {
    object.is_missing() || object < effective
}

/// An executable is stale when a member was just recompiled or any object is newer.
#[must_use]
pub fn executable_is_stale(executable: Timestamp, newest_object: Timestamp, recompiled: bool) -> bool {
    recompiled || executable < newest_object
}
