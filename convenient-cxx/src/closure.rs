//! Transitive link closures
//!
//! The closure of a file is everything that has to be present as an object
//! to link it: the file itself plus every implementation file reachable over
//! direct dependency edges. Closures are computed for every file, not just
//! entry points, since flag propagation reads them too.

use crate::graph::SourceGraph;
use crate::{BuildError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reflexive transitive closure of one file, sorted by path.
///
/// The underlying walk visits each file once, so mutually dependent files
/// terminate and end up in each other's closure.
///
/// # Errors
///
/// Returns `BuildError::UnknownFile` if the file is not in the graph.
pub fn close_over(graph: &SourceGraph, file: &Path) -> Result<Vec<PathBuf>> {
    let members = graph.graph().closure(graph.node(file)?)?;
    graph.paths(members)
}

/// Closures of every implementation file.
#[derive(Debug, Clone, Default)]
pub struct ClosureTable {
    closures: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl ClosureTable {
    /// Close over every node in the graph.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Graph` on an internal graph inconsistency.
    pub fn compute(graph: &SourceGraph) -> Result<Self> {
        let mut closures = BTreeMap::new();
        for id in graph.graph().node_ids() {
            let file = graph.graph().node(id)?;
            let closure = close_over(graph, file)?;
            debug!("Closure of {} has {} files", file.display(), closure.len());
            let _ = closures.insert(file.clone(), closure);
        }
        Ok(Self { closures })
    }

    /// Closure of a discovered file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file was not discovered.
    pub fn closure(&self, file: &Path) -> Result<&[PathBuf]> {
        self.closures
            .get(file)
            .map(Vec::as_slice)
            .ok_or_else(|| BuildError::UnknownFile(file.to_path_buf()))
    }
}
