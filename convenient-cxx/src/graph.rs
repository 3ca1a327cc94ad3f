//! Dependency graph construction
//!
//! Each implementation file's include closure is cut down to project
//! headers, and each such header is mapped to its implementation files
//! through a [`CorrespondenceResolver`]. The result is a graph over
//! implementation files only; headers never become nodes.

use crate::correspondence::{CorrespondenceResolver, ExplicitCorrespondence};
use crate::includes::IncludeScan;
use crate::project::Project;
use crate::{BuildError, Result};
use convenient_graph::{DependencyGraph, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Project headers and direct dependencies of one implementation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Localized {
    /// Closure members that are discovered project headers, sorted
    pub local_headers: Vec<PathBuf>,
    /// Implementation files behind those headers, sorted and deduplicated
    pub direct_dependencies: Vec<PathBuf>,
}

/// Split a file's include closure into project headers and the
/// implementation files they correspond to.
///
/// A file that includes its own header lists itself as a direct
/// dependency. That self-edge adds nothing to closures or cycles.
#[must_use]
pub fn localize(
    file: &Path,
    closure: &[PathBuf],
    project: &Project,
    resolver: &dyn CorrespondenceResolver,
) -> Localized {
    let headers: BTreeSet<&Path> = project.headers().iter().map(PathBuf::as_path).collect();

    let local_headers: BTreeSet<PathBuf> = closure
        .iter()
        .filter(|path| headers.contains(path.as_path()))
        .cloned()
        .collect();

    let direct_dependencies: BTreeSet<PathBuf> = local_headers
        .iter()
        .flat_map(|header| resolver.implementations(header, project))
        .collect();

    debug!(
        "{} depends on [{}]",
        file.display(),
        direct_dependencies
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Localized {
        local_headers: local_headers.into_iter().collect(),
        direct_dependencies: direct_dependencies.into_iter().collect(),
    }
}

/// Direct dependency edges between implementation files.
#[derive(Debug, Clone, Default)]
pub struct SourceGraph {
    graph: DependencyGraph<PathBuf>,
    local_headers: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl SourceGraph {
    /// Build the graph for every discovered implementation file.
    ///
    /// Every header is resolved once up front. Headers with no
    /// implementation are interface-only and add no edge.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Graph` on an internal graph inconsistency.
    pub fn build(project: &Project, includes: &IncludeScan, resolver: &dyn CorrespondenceResolver) -> Result<Self> {
        let resolved = ExplicitCorrespondence::snapshot(project, resolver);
        let mut graph = DependencyGraph::new();
        for source in project.sources() {
            let _ = graph.add_node(source.path.clone());
        }

        let mut local_headers = BTreeMap::new();
        for source in project.sources() {
            let localized = localize(&source.path, includes.closure(&source.path), project, &resolved);
            let from = graph.add_node(source.path.clone());
            for dependency in &localized.direct_dependencies {
                let to = graph.add_node(dependency.clone());
                graph.add_edge(from, to)?;
            }
            let _ = local_headers.insert(source.path.clone(), localized.local_headers);
        }

        let built = Self { graph, local_headers };
        for cycle in built.cycles()? {
            debug!(
                "Mutual dependency between {}",
                cycle.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
            );
        }
        info!(
            "Dependency graph has {} files and {} edges",
            built.graph.node_count(),
            built.graph.edge_count()
        );
        Ok(built)
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph<PathBuf> {
        &self.graph
    }

    /// Node of a discovered implementation file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file is not in the graph.
    pub fn node(&self, path: &Path) -> Result<NodeId> {
        self.graph
            .find(&path.to_path_buf())
            .ok_or_else(|| BuildError::UnknownFile(path.to_path_buf()))
    }

    /// Project headers in the include closure of `path`, sorted.
    ///
    /// Files that were never scanned have none.
    #[must_use]
    pub fn local_headers(&self, path: &Path) -> &[PathBuf] {
        self.local_headers.get(path).map_or(&[], Vec::as_slice)
    }

    /// Implementation files `path` depends on directly, sorted.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file is not in the graph.
    pub fn direct_dependencies(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.paths(self.graph.dependencies(self.node(path)?)?)
    }

    /// Implementation files that depend on `path` directly, sorted.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file is not in the graph.
    pub fn direct_dependents(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.paths(self.graph.dependents(self.node(path)?)?)
    }

    /// Groups of implementation files that depend on each other in a cycle.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Graph` on an internal graph inconsistency.
    pub fn cycles(&self) -> Result<Vec<Vec<PathBuf>>> {
        self.graph
            .cycles()
            .into_iter()
            .map(|cycle| self.paths(cycle))
            .collect()
    }

    pub(crate) fn paths(&self, ids: Vec<NodeId>) -> Result<Vec<PathBuf>> {
        let mut paths = ids
            .into_iter()
            .map(|id| self.graph.node(id).cloned())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        paths.sort();
        Ok(paths)
    }
}
