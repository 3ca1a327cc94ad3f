//! Build context
//!
//! The analysis stages run once per invocation, strictly in order, and each
//! one only reads what the earlier stages produced. [`BuildContext`] holds
//! those results; nothing in it changes after [`BuildContext::analyze`]
//! returns.

use crate::closure::ClosureTable;
use crate::config::ToolchainConfig;
use crate::correspondence::CorrespondenceResolver;
use crate::flags::{FileFlags, FlagTable};
use crate::graph::SourceGraph;
use crate::includes::IncludeScan;
use crate::project::Project;
use crate::staleness::Timestamps;
use crate::toolchain::Toolchain;
use crate::Result;
use std::path::{Path, PathBuf};

/// Everything the orchestrator needs, computed up front.
#[derive(Debug, Clone)]
pub struct BuildContext {
    project: Project,
    graph: SourceGraph,
    closures: ClosureTable,
    flags: FlagTable,
    timestamps: Timestamps,
}

impl BuildContext {
    /// Run every analysis stage over a discovered project.
    ///
    /// The toolchain is only asked for dependency listings here.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the analysis.
    pub fn analyze(
        project: Project,
        config: &ToolchainConfig,
        toolchain: &dyn Toolchain,
        resolver: &dyn CorrespondenceResolver,
    ) -> Result<Self> {
        let includes = IncludeScan::scan(&project, toolchain, config)?;
        Self::from_includes(project, &includes, config, resolver)
    }

    /// Run the stages after include extraction.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the analysis.
    pub fn from_includes(
        project: Project,
        includes: &IncludeScan,
        config: &ToolchainConfig,
        resolver: &dyn CorrespondenceResolver,
    ) -> Result<Self> {
        let graph = SourceGraph::build(&project, includes, resolver)?;
        let closures = ClosureTable::compute(&graph)?;
        let flags = FlagTable::propagate(&project, includes, &graph, &closures)?;
        let timestamps = Timestamps::compute(&project, &graph, config);

        Ok(Self {
            project,
            graph,
            closures,
            flags,
            timestamps,
        })
    }

    /// Discovered sources and headers.
    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Direct dependency graph.
    #[must_use]
    pub fn graph(&self) -> &SourceGraph {
        &self.graph
    }

    /// Link closures.
    #[must_use]
    pub fn closures(&self) -> &ClosureTable {
        &self.closures
    }

    /// Effective timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Closure of one file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file was not discovered.
    pub fn closure(&self, file: &Path) -> Result<&[PathBuf]> {
        self.closures.closure(file)
    }

    /// Final flags of one file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file was not discovered.
    pub fn flags(&self, file: &Path) -> Result<&FileFlags> {
        self.flags.get(file)
    }
}
